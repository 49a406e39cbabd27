use crate::domain::{ErrorKind, FanoError, FanoResult, NormalizedSpectrum, Spectrum};

fn integration_time(role: &str, milliseconds: u32) -> FanoResult<f64> {
    if milliseconds == 0 {
        return Err(FanoError::new(
            ErrorKind::InvalidIntegrationTime,
            format!("{role} integration time is 0 ms"),
        ));
    }
    Ok(f64::from(milliseconds))
}

/// Scales by integration time and divides by the maximum, so the result peaks
/// at exactly 1.0.
pub fn normalize_without_background(
    scan: &Spectrum,
    integration_time_ms: u32,
) -> FanoResult<NormalizedSpectrum> {
    let time = integration_time("scan", integration_time_ms)?;
    let corrected: Vec<f64> = scan.intensity.iter().map(|value| value / time).collect();

    let maximum = corrected
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !maximum.is_finite() || maximum <= 0.0 {
        return Err(FanoError::new(
            ErrorKind::DegenerateSpectrum,
            format!(
                "spectrum maximum {} cannot be used to normalize without a background",
                maximum
            ),
        ));
    }

    Ok(NormalizedSpectrum {
        wavelength: scan.wavelength.clone(),
        normalized_intensity: corrected.iter().map(|value| value / maximum).collect(),
        background_used: false,
    })
}

/// `raw × (t_scan / t_background) / background`, sample by sample.
pub fn normalize_with_background(
    scan: &Spectrum,
    background: &Spectrum,
    scan_time_ms: u32,
    background_time_ms: u32,
) -> FanoResult<NormalizedSpectrum> {
    let scan_time = integration_time("scan", scan_time_ms)?;
    let background_time = integration_time("background", background_time_ms)?;

    if scan.len() != background.len() {
        return Err(FanoError::new(
            ErrorKind::SpectrumLengthMismatch,
            format!(
                "scan has {} points but background has {}",
                scan.len(),
                background.len()
            ),
        ));
    }

    if let Some(index) = background.intensity.iter().position(|value| *value == 0.0) {
        return Err(FanoError::new(
            ErrorKind::ZeroBackground,
            format!(
                "background intensity is zero at index {} (wavelength {})",
                index, background.wavelength[index]
            ),
        ));
    }

    let scale = scan_time / background_time;
    let normalized_intensity = scan
        .intensity
        .iter()
        .zip(&background.intensity)
        .map(|(raw, reference)| raw * scale / reference)
        .collect();

    Ok(NormalizedSpectrum {
        wavelength: scan.wavelength.clone(),
        normalized_intensity,
        background_used: true,
    })
}

#[cfg(test)]
mod tests {
    use super::{normalize_with_background, normalize_without_background};
    use crate::domain::{ErrorKind, Spectrum};

    #[test]
    fn normalization_without_background_peaks_at_one() {
        let scan = Spectrum::new(
            vec![500.0, 501.0, 502.0, 503.0],
            vec![120.0, 480.0, 333.3, 0.0],
        );

        let normalized =
            normalize_without_background(&scan, 100).expect("positive spectrum should normalize");

        let maximum = normalized
            .normalized_intensity
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(maximum, 1.0);
        assert!(!normalized.background_used);
        assert_eq!(normalized.wavelength, scan.wavelength);
        assert!((normalized.normalized_intensity[0] - 0.25).abs() <= 1.0e-15);
    }

    #[test]
    fn background_scale_is_the_integration_time_ratio() {
        let scan = Spectrum::new(vec![500.0, 501.0, 502.0], vec![10.0, 20.0, 30.0]);
        let background = Spectrum::new(vec![500.0, 501.0, 502.0], vec![5.0, 5.0, 10.0]);

        let normalized = normalize_with_background(&scan, &background, 100, 200)
            .expect("matching spectra should normalize");

        assert_eq!(normalized.normalized_intensity, vec![1.0, 2.0, 1.5]);
        assert!(normalized.background_used);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let scan = Spectrum::new(vec![500.0, 501.0], vec![1.0, 2.0]);
        let background = Spectrum::new(vec![500.0], vec![1.0]);

        let error = normalize_with_background(&scan, &background, 100, 100)
            .expect_err("mismatched lengths should fail");
        assert_eq!(error.kind(), ErrorKind::SpectrumLengthMismatch);
    }

    #[test]
    fn any_zero_background_sample_fails_the_file() {
        let scan = Spectrum::new(vec![500.0, 501.0, 502.0], vec![1.0, 2.0, 3.0]);
        let background = Spectrum::new(vec![500.0, 501.0, 502.0], vec![1.0, 0.0, 3.0]);

        let error = normalize_with_background(&scan, &background, 100, 100)
            .expect_err("zero background should fail");
        assert_eq!(error.kind(), ErrorKind::ZeroBackground);
        assert!(error.message().contains("index 1"));
    }

    #[test]
    fn zero_integration_time_fails_the_file_in_both_modes() {
        let scan = Spectrum::new(vec![500.0, 501.0, 502.0], vec![1.0, 2.0, 3.0]);
        let background = Spectrum::new(vec![500.0, 501.0, 502.0], vec![1.0, 1.0, 1.0]);

        let error = normalize_without_background(&scan, 0).expect_err("0 ms scan should fail");
        assert_eq!(error.kind(), ErrorKind::InvalidIntegrationTime);

        let error = normalize_with_background(&scan, &background, 0, 100)
            .expect_err("0 ms scan should fail");
        assert_eq!(error.kind(), ErrorKind::InvalidIntegrationTime);
        assert!(error.message().starts_with("scan"));

        let error = normalize_with_background(&scan, &background, 100, 0)
            .expect_err("0 ms background should fail");
        assert_eq!(error.kind(), ErrorKind::InvalidIntegrationTime);
        assert!(error.message().starts_with("background"));
    }

    #[test]
    fn non_positive_spectrum_is_degenerate() {
        let scan = Spectrum::new(vec![500.0, 501.0], vec![0.0, -2.0]);
        let error =
            normalize_without_background(&scan, 100).expect_err("flat zero spectrum should fail");
        assert_eq!(error.kind(), ErrorKind::DegenerateSpectrum);
    }
}
