use crate::adapters::nifti_loader;
use crate::core::codec::MappingFormat;
use crate::domain::geometry::{AffineGeometry, VolumeGeometry};
use crate::domain::model::Axis;
use crate::utils::error::{RbsyncError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const VALID_FORMATS: [&str; 2] = ["json", "csv"];
const NIFTI_SUFFIXES: [&str; 2] = ["nii", "nii.gz"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session: Option<SessionSection>,
    pub source: VolumeConfig,
    pub target: VolumeConfig,
    pub adjustments: Option<Vec<AdjustmentConfig>>,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    pub name: Option<String>,
    /// "AP", "LR", "SI" or the index as a string. Defaults to SI.
    pub axis: Option<String>,
}

/// A volume is described either by a NIfTI file whose header is read, or
/// inline by its affine and shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub nifti: Option<String>,
    pub affine: Option<[[f64; 4]; 4]>,
    pub shape: Option<[usize; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    pub source_index: usize,
    pub delta: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_path: String,
    pub formats: Vec<String>,
    pub json_filename: Option<String>,
    pub csv_filename: Option<String>,
}

impl SessionConfig {
    /// Loads a session from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RbsyncError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RbsyncError::Config {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` references with environment values. Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RbsyncError::Config {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn axis(&self) -> Result<Axis> {
        match self.session.as_ref().and_then(|s| s.axis.as_deref()) {
            Some(axis) => axis.parse(),
            None => Ok(Axis::default()),
        }
    }

    pub fn session_name(&self) -> &str {
        self.session
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("rbsync")
    }

    pub fn formats(&self) -> Result<Vec<MappingFormat>> {
        let mut formats = Vec::new();
        for name in &self.export.formats {
            let format: MappingFormat = name.parse()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }

    pub fn file_name(&self, format: MappingFormat) -> String {
        let configured = match format {
            MappingFormat::Json => self.export.json_filename.as_ref(),
            MappingFormat::Csv => self.export.csv_filename.as_ref(),
        };
        configured
            .cloned()
            .unwrap_or_else(|| format.default_file_name().to_string())
    }

    pub fn adjustments(&self) -> &[AdjustmentConfig] {
        self.adjustments.as_deref().unwrap_or(&[])
    }

    pub fn validate_config(&self) -> Result<()> {
        self.axis().map_err(|e| RbsyncError::InvalidConfigValue {
            field: "session.axis".to_string(),
            value: self
                .session
                .as_ref()
                .and_then(|s| s.axis.clone())
                .unwrap_or_default(),
            reason: e.to_string(),
        })?;

        self.source.validate_volume("source")?;
        self.target.validate_volume("target")?;

        validation::validate_path("export.output_path", &self.export.output_path)?;
        if self.export.formats.is_empty() {
            return Err(RbsyncError::MissingConfig {
                field: "export.formats".to_string(),
            });
        }
        validation::validate_allowed_values("export.formats", &self.export.formats, &VALID_FORMATS)?;

        if let Some(name) = &self.export.json_filename {
            validation::validate_non_empty_string("export.json_filename", name)?;
        }
        if let Some(name) = &self.export.csv_filename {
            validation::validate_non_empty_string("export.csv_filename", name)?;
        }

        Ok(())
    }
}

impl VolumeConfig {
    fn validate_volume(&self, role: &str) -> Result<()> {
        match (&self.nifti, &self.affine, &self.shape) {
            (Some(path), None, None) => {
                validation::validate_path(&format!("{}.nifti", role), path)?;
                validation::validate_file_suffix(&format!("{}.nifti", role), path, &NIFTI_SUFFIXES)
            }
            (None, Some(_), Some(shape)) => {
                for extent in shape {
                    validation::validate_positive_number(&format!("{}.shape", role), *extent, 1)?;
                }
                Ok(())
            }
            (None, Some(_), None) => Err(RbsyncError::MissingConfig {
                field: format!("{}.shape", role),
            }),
            (None, None, Some(_)) => Err(RbsyncError::MissingConfig {
                field: format!("{}.affine", role),
            }),
            (None, None, None) => Err(RbsyncError::MissingConfig {
                field: format!("{}.nifti", role),
            }),
            (Some(_), _, _) => Err(RbsyncError::Config {
                field: role.to_string(),
                message: "give either a nifti path or an inline affine and shape, not both".to_string(),
            }),
        }
    }

    pub fn resolve(&self, role: &str) -> Result<VolumeGeometry> {
        if let Some(path) = &self.nifti {
            return nifti_loader::load_volume_geometry(path);
        }
        let affine = validation::validate_required_field(&format!("{}.affine", role), &self.affine)?;
        let shape = validation::validate_required_field(&format!("{}.shape", role), &self.shape)?;
        VolumeGeometry::new(AffineGeometry::from_rows(*affine)?, *shape)
    }
}

impl Validate for SessionConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
