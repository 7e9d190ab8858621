// ============================================================================
// ENGINE SETTINGS — persisted as key=value lines in the user config dir
// ============================================================================

use std::path::{Path, PathBuf};

use crate::components::history::{DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES};
use crate::components::tools::DEFAULT_ERASE_RADIUS;
use crate::io::{DEFAULT_QUALITY, ExportFormat};

const SETTINGS_FILE: &str = "retouch_settings.cfg";

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Maximum number of undo snapshots.
    pub max_undo_steps: usize,
    /// Memory cap for undo snapshots in megabytes (0 = unlimited).
    pub max_history_mb: usize,
    /// Eraser radius a fresh engine starts with.
    pub erase_radius: f32,
    /// Export format used when none is given.
    pub export_format: ExportFormat,
    /// JPEG quality 1-100.
    pub export_quality: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_ENTRIES,
            max_history_mb: DEFAULT_MAX_BYTES / (1024 * 1024),
            erase_radius: DEFAULT_ERASE_RADIUS,
            export_format: ExportFormat::Png,
            export_quality: DEFAULT_QUALITY,
        }
    }
}

impl EngineSettings {
    /// History memory cap in bytes, `None` when unlimited.
    pub fn max_history_bytes(&self) -> Option<usize> {
        match self.max_history_mb {
            0 => None,
            mb => Some(mb.saturating_mul(1024 * 1024)),
        }
    }

    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("Retouch").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Retouch")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("retouch").join(SETTINGS_FILE))
        }
    }

    /// Load from the platform config file, falling back to defaults.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. A missing file gives defaults; unknown keys and
    /// unparsable values are skipped.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.max(1);
                    }
                }
                "max_history_mb" => {
                    if let Ok(v) = val.parse() {
                        s.max_history_mb = v;
                    }
                }
                "erase_radius" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.erase_radius = v;
                    }
                }
                "export_format" => {
                    if let Some(f) = ExportFormat::parse(val) {
                        s.export_format = f;
                    }
                }
                "export_quality" => {
                    if let Ok(v) = val.parse::<u8>() {
                        s.export_quality = v.clamp(1, 100);
                    }
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_cfg_string(&self) -> String {
        format!(
            "max_undo_steps={}\nmax_history_mb={}\nerase_radius={}\nexport_format={}\nexport_quality={}\n",
            self.max_undo_steps,
            self.max_history_mb,
            self.erase_radius,
            self.export_format.extension(),
            self.export_quality,
        )
    }

    /// Write to the platform config file.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::settings_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no config directory available",
            ));
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_cfg_string())
    }
}
