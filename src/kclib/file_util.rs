use kpcoco_domain::{kcerr, KcResult};
use lazy_static::lazy_static;
use std::{
    ffi::OsStr,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{error, info};

lazy_static! {
    pub static ref DEFAULT_TMPDIR: PathBuf = std::env::temp_dir().join("kpcoco");
}
lazy_static! {
    pub static ref DEFAULT_HOMEDIR: PathBuf = match dirs::home_dir() {
        Some(p) => p.join(".kpcoco"),
        _ => std::env::temp_dir().join("kpcoco"),
    };
}

/// Creates the folder and all its missing parents. Existing paths are left alone.
pub fn create_folder<P>(path: P) -> KcResult<()>
where
    P: AsRef<Path> + Debug,
{
    if !path.as_ref().exists() {
        fs::create_dir_all(&path)
            .map_err(|e| kcerr!("could not create folder {:?} due to {:?}", path, e))?;
        info!("created folder {path:?}");
    }
    Ok(())
}

/// Joins the project root with the path segments of a row key of the keypoint table.
pub fn row_key_to_path<S>(root: &Path, segments: &[S]) -> PathBuf
where
    S: AsRef<Path>,
{
    segments
        .iter()
        .fold(root.to_path_buf(), |p, segment| p.join(segment))
}

pub fn read_to_string<P>(p: P) -> KcResult<String>
where
    P: AsRef<Path> + Debug,
{
    fs::read_to_string(&p).map_err(|e| kcerr!("could not read {:?} due to {:?}", p, e))
}

pub fn write<P, C>(path: P, contents: C) -> KcResult<()>
where
    P: AsRef<Path> + Debug,
    C: AsRef<[u8]>,
{
    fs::write(&path, contents).map_err(|e| kcerr!("could not write to {:?} since {:?}", path, e))
}

pub fn path_to_str(p: &Path) -> KcResult<&str> {
    osstr_to_str(Some(p.as_os_str()))
        .map_err(|e| kcerr!("path_to_str could not transform '{:?}' due to '{:?}'", p, e))
}

pub fn osstr_to_str(p: Option<&OsStr>) -> io::Result<&str> {
    p.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{p:?} not found")))?
        .to_str()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{p:?} not convertible to unicode"),
            )
        })
}

pub struct Defer<F: FnMut()> {
    pub func: F,
}
impl<F: FnMut()> Drop for Defer<F> {
    fn drop(&mut self) {
        (self.func)();
    }
}
#[macro_export]
macro_rules! defer {
    ($f:expr) => {
        let _dfr = $crate::file_util::Defer { func: $f };
    };
}
pub fn checked_remove<'a, P: AsRef<Path> + Debug>(
    path: &'a P,
    func: fn(p: &'a P) -> io::Result<()>,
) {
    match func(path) {
        Ok(_) => info!("removed {path:?}"),
        Err(e) => error!("could not remove {path:?} due to {e:?}"),
    }
}
#[macro_export]
macro_rules! defer_folder_removal {
    ($path:expr) => {
        let func = || $crate::file_util::checked_remove($path, std::fs::remove_dir_all);
        $crate::defer!(func);
    };
}

pub fn get_test_folder() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources/test_data")
}

#[test]
fn test_create_folder() {
    let folder = DEFAULT_TMPDIR.join("test_create_folder").join("a").join("b");
    let top = DEFAULT_TMPDIR.join("test_create_folder");
    defer_folder_removal!(&top);
    create_folder(&folder).unwrap();
    assert!(folder.is_dir());
    // second call is a no-op
    create_folder(&folder).unwrap();
    assert!(folder.is_dir());
}

#[test]
fn test_create_folder_fails_below_file() {
    let top = DEFAULT_TMPDIR.join("test_create_folder_below_file");
    defer_folder_removal!(&top);
    create_folder(&top).unwrap();
    let file = top.join("some_file.txt");
    write(&file, "not a folder").unwrap();
    assert!(create_folder(file.join("sub")).is_err());
}

#[test]
fn test_row_key_to_path() {
    let root = Path::new("/prj");
    let p = row_key_to_path(root, &["labeled-data", "video1", "img001.png"]);
    assert_eq!(p, PathBuf::from("/prj/labeled-data/video1/img001.png"));
    let p = row_key_to_path(root, &["labeled-data/video1/img001.png".to_string()]);
    assert_eq!(p, PathBuf::from("/prj/labeled-data/video1/img001.png"));
}
