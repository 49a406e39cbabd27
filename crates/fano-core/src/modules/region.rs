use crate::domain::{ErrorKind, FanoError, FanoResult, TrimRange};

/// What a selector gets to look at before choosing a window.
#[derive(Debug, Clone, Copy)]
pub struct RegionRequest<'a> {
    pub label: &'a str,
    pub wavelength: &'a [f64],
    pub intensity: &'a [f64],
}

/// Chooses the inclusive index window the fitter should use.
pub trait RegionSelector {
    fn select_region(&mut self, request: &RegionRequest<'_>) -> FanoResult<TrimRange>;
}

impl<T: RegionSelector + ?Sized> RegionSelector for &mut T {
    fn select_region(&mut self, request: &RegionRequest<'_>) -> FanoResult<TrimRange> {
        (**self).select_region(request)
    }
}

/// Same index window for every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRegion(pub TrimRange);

impl RegionSelector for FixedRegion {
    fn select_region(&mut self, _request: &RegionRequest<'_>) -> FanoResult<TrimRange> {
        Ok(self.0)
    }
}

/// Two wavelengths mapped to their nearest sample indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthWindow {
    pub first: f64,
    pub second: f64,
}

impl WavelengthWindow {
    pub const fn new(first: f64, second: f64) -> Self {
        Self { first, second }
    }

    pub fn resolve(&self, wavelength: &[f64]) -> FanoResult<TrimRange> {
        if !self.first.is_finite() || !self.second.is_finite() {
            return Err(FanoError::new(
                ErrorKind::RegionSelection,
                format!(
                    "window bounds must be finite, got {} and {}",
                    self.first, self.second
                ),
            ));
        }

        let missing = || {
            FanoError::new(
                ErrorKind::RegionSelection,
                "cannot select a window on an empty spectrum",
            )
        };
        let first = nearest_index(wavelength, self.first).ok_or_else(missing)?;
        let second = nearest_index(wavelength, self.second).ok_or_else(missing)?;
        Ok(TrimRange::new(first.min(second), first.max(second)))
    }
}

impl RegionSelector for WavelengthWindow {
    fn select_region(&mut self, request: &RegionRequest<'_>) -> FanoResult<TrimRange> {
        self.resolve(request.wavelength)
    }
}

/// Index minimizing `|wavelength[i] - target|`; ties keep the first index.
pub fn nearest_index(wavelength: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in wavelength.iter().enumerate() {
        let distance = (value - target).abs();
        if distance.is_nan() {
            continue;
        }
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::{FixedRegion, RegionRequest, RegionSelector, WavelengthWindow, nearest_index};
    use crate::domain::{ErrorKind, TrimRange};

    const WAVELENGTH: [f64; 6] = [500.0, 500.5, 501.0, 501.5, 502.0, 502.5];

    fn request() -> RegionRequest<'static> {
        RegionRequest {
            label: "A1_P250_TE",
            wavelength: &WAVELENGTH,
            intensity: &[0.0; 6],
        }
    }

    #[test]
    fn nearest_index_prefers_first_on_ties() {
        assert_eq!(nearest_index(&WAVELENGTH, 500.74), Some(1));
        assert_eq!(nearest_index(&WAVELENGTH, 500.75), Some(1));
        assert_eq!(nearest_index(&WAVELENGTH, 900.0), Some(5));
        assert_eq!(nearest_index(&[], 500.0), None);
    }

    #[test]
    fn wavelength_window_is_order_insensitive() {
        let forward = WavelengthWindow::new(500.4, 502.1)
            .select_region(&request())
            .expect("window should resolve");
        let reverse = WavelengthWindow::new(502.1, 500.4)
            .select_region(&request())
            .expect("window should resolve");

        assert_eq!(forward, TrimRange::new(1, 4));
        assert_eq!(forward, reverse);
    }

    #[test]
    fn non_finite_bounds_are_rejected() {
        let error = WavelengthWindow::new(f64::NAN, 501.0)
            .select_region(&request())
            .expect_err("NaN bound should fail");
        assert_eq!(error.kind(), ErrorKind::RegionSelection);
    }

    #[test]
    fn fixed_region_returns_its_range_through_a_borrow() {
        fn select_with<S: RegionSelector>(mut selector: S) -> TrimRange {
            selector
                .select_region(&request())
                .expect("fixed region never fails")
        }

        let mut selector = FixedRegion(TrimRange::new(0, 3));
        assert_eq!(select_with(&mut selector), TrimRange::new(0, 3));
        assert_eq!(select_with(selector), TrimRange::new(0, 3));
    }
}
