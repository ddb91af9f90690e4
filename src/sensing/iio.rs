use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use super::sources::Barometer;

const MILLIBARS_PER_KILOPASCAL: f64 = 10.0;

/// Pressure channel exposed by the Linux IIO subsystem. The processed
/// `in_pressure_input` attribute is in kilopascals.
#[derive(Debug, Clone)]
pub struct IioBarometer {
    path: PathBuf,
}

impl IioBarometer {
    pub fn open(path: PathBuf) -> Result<Self> {
        fs::metadata(&path)
            .with_context(|| format!("no pressure sensor available at {}", path.display()))?;
        Ok(Self { path })
    }
}

impl Barometer for IioBarometer {
    fn read_millibars(&mut self) -> Result<f64> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let kilopascals: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("unexpected pressure value '{}'", raw.trim()))?;
        Ok(kilopascals * MILLIBARS_PER_KILOPASCAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_channel(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("in_pressure_input-{}", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn converts_kilopascals_to_millibars() {
        let path = temp_channel("101.325\n");
        let mut barometer = IioBarometer::open(path.clone()).unwrap();

        let millibars = barometer.read_millibars().unwrap();

        assert!((millibars - 1013.25).abs() < 1e-9);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn garbage_is_an_error() {
        let path = temp_channel("not-a-number");
        let mut barometer = IioBarometer::open(path.clone()).unwrap();
        assert!(barometer.read_millibars().is_err());
        let _ = fs::remove_file(path);
    }
}
