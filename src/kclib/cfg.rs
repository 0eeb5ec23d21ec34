use crate::{
    file_util::{self, DEFAULT_HOMEDIR},
    seed::SeedCfg,
};
use kpcoco_domain::{kcerr, KcResult, TPtF, DEFAULT_BBOX_MARGIN};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

const CFG_DEFAULT: &str = r#"
    bbox_margin = 20.0
    image_id_offset = 0
    # train_fraction = 0.95
    log_to_file = true
    # home_folder =
    [seed]
    seed = 42
    deterministic = true
    "#;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Cfg {
    pub bbox_margin: Option<TPtF>,
    pub image_id_offset: Option<u32>,
    /// if set, the output is split into a training and a test file
    pub train_fraction: Option<f64>,
    pub log_to_file: Option<bool>,
    pub home_folder: Option<String>,
    #[serde(default)]
    pub seed: SeedCfg,
}
impl Cfg {
    pub fn bbox_margin(&self) -> TPtF {
        self.bbox_margin.unwrap_or(DEFAULT_BBOX_MARGIN)
    }
    pub fn image_id_offset(&self) -> u32 {
        self.image_id_offset.unwrap_or(0)
    }
    pub fn log_to_file(&self) -> bool {
        self.log_to_file.unwrap_or(true)
    }
    pub fn home_folder(&self) -> PathBuf {
        match &self.home_folder {
            Some(hf) => PathBuf::from(hf),
            None => DEFAULT_HOMEDIR.to_path_buf(),
        }
    }
}
impl Default for Cfg {
    fn default() -> Self {
        get_default_cfg()
    }
}

pub fn get_default_cfg() -> Cfg {
    toml::from_str(CFG_DEFAULT).expect("default config broken")
}

pub fn get_cfg_path() -> PathBuf {
    DEFAULT_HOMEDIR.join("kp_cfg.toml")
}

pub fn get_log_folder(home_folder: &Path) -> PathBuf {
    home_folder.join("logs")
}

pub fn read_cfg_gen<CFG: Debug + DeserializeOwned + Default>(
    cfg_toml_path: &Path,
) -> KcResult<CFG> {
    if cfg_toml_path.exists() {
        let toml_str = file_util::read_to_string(cfg_toml_path)?;
        toml::from_str(&toml_str).map_err(|e| kcerr!("could not parse cfg due to {:?}", e))
    } else {
        warn!("cfg {cfg_toml_path:?} file does not exist. using default cfg");
        Ok(CFG::default())
    }
}

pub fn read_cfg() -> KcResult<Cfg> {
    read_cfg_gen(&get_cfg_path())
}

pub fn write_cfg(cfg: &Cfg, p: &Path) -> KcResult<()> {
    let cfg_str = toml::to_string_pretty(cfg).map_err(|e| kcerr!("{:?}", e))?;
    if let Some(parent) = p.parent() {
        file_util::create_folder(parent)?;
    }
    file_util::write(p, cfg_str)?;
    info!("wrote cfg to {p:?}");
    Ok(())
}

#[test]
fn test_default_cfg() {
    let cfg = get_default_cfg();
    assert_eq!(cfg.bbox_margin(), DEFAULT_BBOX_MARGIN);
    assert_eq!(cfg.image_id_offset(), 0);
    assert_eq!(cfg.train_fraction, None);
    assert_eq!(cfg.seed, SeedCfg::default());
    assert_eq!(cfg.home_folder(), DEFAULT_HOMEDIR.to_path_buf());
    assert_eq!(get_log_folder(&cfg.home_folder()), DEFAULT_HOMEDIR.join("logs"));
}

#[test]
fn test_read_cfg() {
    let test_folder = file_util::get_test_folder();
    let cfg = read_cfg_gen::<Cfg>(&test_folder.join("kp_cfg_doesntexist.toml")).unwrap();
    assert_eq!(cfg, get_default_cfg());
    let cfg = read_cfg_gen::<Cfg>(&test_folder.join("kp_cfg.toml")).unwrap();
    assert_eq!(cfg.bbox_margin(), 10.0);
    assert_eq!(cfg.image_id_offset(), 100);
    assert_eq!(cfg.train_fraction, Some(0.8));
    assert_eq!(cfg.seed, SeedCfg::new(3));
}

#[test]
fn test_write_read_cfg() {
    let folder = file_util::DEFAULT_TMPDIR.join("test_write_read_cfg");
    crate::defer_folder_removal!(&folder);
    let p = folder.join("kp_cfg.toml");
    let mut cfg = get_default_cfg();
    cfg.bbox_margin = Some(5.0);
    cfg.home_folder = Some("/tmp/kpcoco-home".to_string());
    write_cfg(&cfg, &p).unwrap();
    let read = read_cfg_gen::<Cfg>(&p).unwrap();
    assert_eq!(read, cfg);
}
