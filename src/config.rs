use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::{info, warn};
use serde::Deserialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::engine::{EngineConfig, Mode};
use crate::gestures::ClassifierConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub commit_frames: u32,
    pub thumb_extension: f32,
    pub circle_distance: f32,
    pub auto_reset_ms: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            commit_frames: engine.commit_frames,
            thumb_extension: engine.classifier.thumb_extension,
            circle_distance: engine.classifier.circle_distance,
            auto_reset_ms: engine.auto_reset_ms,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Capture {
    pub mode: Mode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Input {
    pub source: String,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            source: "stdin".to_string(),
        }
    }
}

impl Input {
    /// `None` means stdin.
    pub fn source_path(&self) -> Option<PathBuf> {
        match self.source.trim() {
            "" | "-" | "stdin" => None,
            p => Some(PathBuf::from(p)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Output {
    pub narrate: bool,
    pub history_limit: usize,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            narrate: true,
            history_limit: crate::history::DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub capture: Capture,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub output: Output,
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            commit_frames: self.thresholds.commit_frames,
            classifier: ClassifierConfig {
                thumb_extension: self.thresholds.thumb_extension,
                circle_distance: self.thresholds.circle_distance,
            },
            auto_reset_ms: self.thresholds.auto_reset_ms,
            mode: self.capture.mode,
        }
    }
}

/// Where profiles live on disk.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

impl ConfigPaths {
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            profiles_dir: config_dir.join("profiles"),
            active_ptr: config_dir.join("active"),
            config_dir,
        }
    }

    /// `~/.config/handcalc`
    pub fn user() -> Result<Self> {
        let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
        Ok(Self::in_dir(dirs.home_dir().join(".config").join("handcalc")))
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.toml"))
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub paths: ConfigPaths,
}

pub fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl DaemonConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::load_or_install_in(ConfigPaths::user()?)
    }

    pub fn load_or_install_in(paths: ConfigPaths) -> Result<Self> {
        fs::create_dir_all(&paths.profiles_dir)?;

        let def_path = paths.profile_path("default");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        if !paths.active_ptr.exists() {
            let mut f = fs::File::create(&paths.active_ptr)?;
            f.write_all(b"default")?;
        }

        let mut active_name = fs::read_to_string(&paths.active_ptr)?.trim().to_string();
        if active_name.is_empty() {
            warn!("active profile pointer is empty; using 'default'");
            active_name = "default".to_string();
        }
        let profile = load_profile(&paths, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            paths,
        })
    }

    /// Keeps the current profile when the file on disk fails to load.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.paths, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.paths.profile_path(name);
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = load_profile(&self.paths, name)?;
        fs::write(&self.paths.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn active_profile_path(&self) -> PathBuf {
        self.paths.profile_path(&self.active_name)
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.paths.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let source = self.profile.input.source_path();
        let source_ok = source.as_deref().is_none_or(Path::exists);
        serde_json::json!({
            "user": whoami::username(),
            "profiles_dir": self.paths.profiles_dir,
            "active_profile": self.active_name,
            "profiles": self.list_profiles(),
            "frame_source": self.profile.input.source,
            "frame_source_present": source_ok,
            "mode": self.profile.capture.mode,
            "thresholds": {
                "commit_frames": self.profile.thresholds.commit_frames,
                "thumb_extension": self.profile.thresholds.thumb_extension,
                "circle_distance": self.profile.thresholds.circle_distance,
                "auto_reset_ms": self.profile.thresholds.auto_reset_ms,
            },
            "hints": {
                "frame_format": "{\"t_ms\": 0, \"landmarks\": [{\"x\":0.5,\"y\":0.5,\"z\":0.0}, ...21]}",
                "fifo": "mkfifo ~/.local/run/handcalc.frames && set [input] source to that path"
            }
        })
    }
}

fn load_profile(paths: &ConfigPaths, name: &str) -> Result<Profile> {
    let path = paths.profile_path(name);
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}

fn validate_profile(p: &Profile) -> Result<()> {
    let th = &p.thresholds;
    if th.commit_frames == 0 {
        return Err(anyhow!("thresholds.commit_frames must be at least 1"));
    }
    if th.auto_reset_ms == 0 {
        return Err(anyhow!("thresholds.auto_reset_ms must be a positive duration"));
    }
    for (key, v) in [
        ("thumb_extension", th.thumb_extension),
        ("circle_distance", th.circle_distance),
    ] {
        if !(v > 0.0 && v < 1.0) {
            return Err(anyhow!(
                "thresholds.{key} must be in (0,1) normalized units, got {v}"
            ));
        }
    }
    if p.output.history_limit == 0 {
        return Err(anyhow!("output.history_limit must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("handcalc-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn default_profile_matches_engine_defaults() {
        let p = Profile::parse(default_profile_text()).unwrap();
        assert_eq!(p.engine_config(), EngineConfig::default());
        assert!(p.output.narrate);
        assert_eq!(p.input.source_path(), None);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let p = Profile::parse("[meta]\nname = \"bare\"\n").unwrap();
        assert_eq!(p.thresholds.commit_frames, 10);
        assert_eq!(p.capture.mode, Mode::Auto);
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let err = Profile::parse("[meta]\n[thresholds]\ncircle_distance = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("circle_distance"));
        assert!(Profile::parse("[meta]\n[thresholds]\ncommit_frames = 0\n").is_err());
    }

    #[test]
    fn rejects_zero_durations_and_limits() {
        let err = Profile::parse("[meta]\n[thresholds]\nauto_reset_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("auto_reset_ms"), "{err}");
        let err = Profile::parse("[meta]\n[output]\nhistory_limit = 0\n").unwrap_err();
        assert!(err.to_string().contains("history_limit"), "{err}");
    }

    #[test]
    fn installs_default_and_switches_profiles() {
        let dir = scratch_dir("switch");
        let mut st = DaemonConfigState::load_or_install_in(ConfigPaths::in_dir(&dir)).unwrap();
        assert_eq!(st.active_name, "default");

        fs::write(
            st.paths.profile_path("slow"),
            "[meta]\nname = \"slow\"\n[thresholds]\ncommit_frames = 20\n[capture]\nmode = \"manual\"\n",
        )
        .unwrap();
        assert_eq!(st.list_profiles(), vec!["default", "slow"]);

        st.set_active("slow").unwrap();
        assert_eq!(st.profile.engine_config().commit_frames, 20);
        assert_eq!(st.profile.capture.mode, Mode::Manual);
        assert_eq!(fs::read_to_string(&st.paths.active_ptr).unwrap(), "slow");
        assert!(st.set_active("missing").is_err());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_reload_keeps_last_good_profile() {
        let dir = scratch_dir("reload");
        let mut st = DaemonConfigState::load_or_install_in(ConfigPaths::in_dir(&dir)).unwrap();
        fs::write(st.active_profile_path(), "not = [valid").unwrap();
        assert!(st.reload().is_err());
        assert_eq!(st.profile.thresholds.commit_frames, 10);
        let _ = fs::remove_dir_all(&dir);
    }
}
