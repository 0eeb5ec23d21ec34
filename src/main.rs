#![deny(clippy::all)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![forbid(unsafe_code)]

use clap::Parser;
use kclib::{
    cfg::{self, Cfg},
    coco_io::{write_coco, CocoKeypointData, ConversionParams},
    file_util::path_to_str,
    result::trace_ok_warn,
    split_train_test, tracing_setup, HeaderShapeReader, KeypointTable, SeedCfg,
};
use kpcoco_domain::KcResult;
use std::{
    ops::Deref,
    panic,
    path::{Path, PathBuf},
};
use tracing::{error, info};

/// Converts a table of labeled keypoints into Coco keypoint annotations
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// csv file with the labeled keypoints
    table: PathBuf,
    /// project folder the row keys of the table are relative to
    #[arg(short, long)]
    root: PathBuf,
    /// json file to write, with `--split` the suffixes `_train` and `_test` are appended
    #[arg(short, long)]
    out: PathBuf,
    /// added to every image id
    #[arg(long)]
    offset: Option<u32>,
    /// slack around the keypoint boxes
    #[arg(long)]
    margin: Option<f64>,
    /// fraction of images that go into the training set, overrides `train_fraction` of the cfg
    #[arg(long, conflicts_with = "no_split")]
    split: Option<f64>,
    /// write a single file even if the cfg has a `train_fraction`
    #[arg(long)]
    no_split: bool,
    #[arg(long)]
    seed: Option<u64>,
    /// config file, defaults to `~/.kpcoco/kp_cfg.toml`
    #[arg(long)]
    cfg: Option<PathBuf>,
}

fn merge_cli_into_cfg(cli: &Cli, mut cfg: Cfg) -> Cfg {
    if let Some(offset) = cli.offset {
        cfg.image_id_offset = Some(offset);
    }
    if let Some(margin) = cli.margin {
        cfg.bbox_margin = Some(margin);
    }
    if let Some(split) = cli.split {
        cfg.train_fraction = Some(split);
    }
    if cli.no_split {
        cfg.train_fraction = None;
    }
    if let Some(seed) = cli.seed {
        cfg.seed = SeedCfg::new(seed);
    }
    cfg
}

fn with_suffix(out: &Path, suffix: &str) -> KcResult<PathBuf> {
    let stem = out
        .file_stem()
        .map(Path::new)
        .map(path_to_str)
        .transpose()?
        .unwrap_or("coco");
    Ok(out.with_file_name(format!("{stem}_{suffix}.json")))
}

fn run(cli: &Cli, cfg: &Cfg) -> KcResult<()> {
    let table = KeypointTable::from_csv_path(&cli.table)?;
    let params = ConversionParams {
        image_id_offset: cfg.image_id_offset(),
        bbox_margin: cfg.bbox_margin(),
    };
    let data =
        CocoKeypointData::from_keypoint_table(&cli.root, &table, params, &HeaderShapeReader)?;
    if let Some(train_fraction) = cfg.train_fraction {
        let (train, test) = split_train_test(&data, train_fraction, &cfg.seed)?;
        write_coco(&with_suffix(&cli.out, "train")?, &train)?;
        write_coco(&with_suffix(&cli.out, "test")?, &test)?;
    } else {
        write_coco(&cli.out, &data)?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let cfg = match &cli.cfg {
        Some(p) => cfg::read_cfg_gen::<Cfg>(p),
        None => cfg::read_cfg(),
    };
    // logging is not set up yet, hence the plain print
    let cfg = cfg.unwrap_or_else(|e| {
        eprintln!("could not read cfg, using default. {e}");
        cfg::get_default_cfg()
    });
    let cfg = merge_cli_into_cfg(&cli, cfg);
    let home_folder = cfg.home_folder();
    let home_folder = trace_ok_warn(kclib::create_folder(&home_folder)).map(|_| home_folder);
    let log_folder = if cfg.log_to_file() {
        home_folder.as_deref()
    } else {
        None
    };
    let _guard_flush_to_logfile = tracing_setup::tracing_setup(log_folder);
    info!("converting {:?} with {cfg:?}", cli.table);
    match panic::catch_unwind(|| run(&cli, &cfg)) {
        Ok(Ok(())) => (),
        Ok(Err(e)) => {
            error!("{e}");
            std::process::exit(1);
        }
        Err(e) => {
            let panic_s = e
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| e.downcast_ref::<&'static str>().map(Deref::deref));
            error!("{:?}", panic_s);
            let b = tracing_setup::BACKTRACE.with(|b| b.borrow_mut().take());
            error!("{:?}", b);
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
use kclib::{defer_folder_removal, file_util::DEFAULT_TMPDIR};

#[test]
fn test_with_suffix() {
    let p = with_suffix(Path::new("/a/b/coco.json"), "train").unwrap();
    assert_eq!(p, PathBuf::from("/a/b/coco_train.json"));
}

#[test]
fn test_merge_cli_into_cfg() {
    let cli = Cli::parse_from([
        "kpcoco", "t.csv", "--root", "prj", "--out", "o.json", "--margin", "3", "--seed", "5",
    ]);
    let cfg = merge_cli_into_cfg(&cli, cfg::get_default_cfg());
    assert_eq!(cfg.bbox_margin(), 3.0);
    assert_eq!(cfg.image_id_offset(), 0);
    assert_eq!(cfg.seed, SeedCfg::new(5));
    assert_eq!(cfg.train_fraction, None);
}

#[test]
fn test_train_fraction_from_cfg() {
    let mut cfg = cfg::get_default_cfg();
    cfg.train_fraction = Some(0.5);
    let cli = Cli::parse_from(["kpcoco", "t.csv", "--root", "prj", "--out", "o.json"]);
    let merged = merge_cli_into_cfg(&cli, cfg.clone());
    assert_eq!(merged.train_fraction, Some(0.5));
    let cli = Cli::parse_from([
        "kpcoco", "t.csv", "--root", "prj", "--out", "o.json", "--no-split",
    ]);
    assert_eq!(merge_cli_into_cfg(&cli, cfg.clone()).train_fraction, None);
    let cli = Cli::parse_from([
        "kpcoco", "t.csv", "--root", "prj", "--out", "o.json", "--split", "0.9",
    ]);
    assert_eq!(merge_cli_into_cfg(&cli, cfg).train_fraction, Some(0.9));
    let res = Cli::try_parse_from([
        "kpcoco", "t.csv", "--root", "prj", "--out", "o.json", "--split", "0.9", "--no-split",
    ]);
    assert!(res.is_err());
}

#[test]
fn test_run_split_from_cfg() {
    let test_folder = kclib::get_test_folder();
    let tmp_folder = DEFAULT_TMPDIR.join("test_run_split_from_cfg");
    defer_folder_removal!(&tmp_folder);
    let root = tmp_folder.join("prj");
    for name in ["img0.png", "img1.png", "img2.png"] {
        let p = root.join("labeled-data").join("v1").join(name);
        kclib::create_folder(p.parent().unwrap()).unwrap();
        image::RgbImage::new(8, 6).save(&p).unwrap();
    }
    let out = tmp_folder.join("coco.json");
    let cli = Cli::parse_from([
        "kpcoco",
        path_to_str(&test_folder.join("CollectedData_multi.csv")).unwrap(),
        "--root",
        path_to_str(&root).unwrap(),
        "--out",
        path_to_str(&out).unwrap(),
    ]);
    let mut cfg = cfg::get_default_cfg();
    cfg.train_fraction = Some(0.34);
    let cfg = merge_cli_into_cfg(&cli, cfg);
    run(&cli, &cfg).unwrap();
    assert!(!out.exists());
    let train = kclib::read_coco(&with_suffix(&out, "train").unwrap()).unwrap();
    let test = kclib::read_coco(&with_suffix(&out, "test").unwrap()).unwrap();
    assert_eq!(train.images.len(), 1);
    assert_eq!(test.images.len(), 2);
}

#[test]
fn test_run_split() {
    let test_folder = kclib::get_test_folder();
    let tmp_folder = DEFAULT_TMPDIR.join("test_run_split");
    defer_folder_removal!(&tmp_folder);
    let root = tmp_folder.join("prj");
    for name in ["img0.png", "img1.png", "img2.png"] {
        let p = root.join("labeled-data").join("v1").join(name);
        kclib::create_folder(p.parent().unwrap()).unwrap();
        image::RgbImage::new(8, 6).save(&p).unwrap();
    }
    let out = tmp_folder.join("out").join("coco.json");
    let cli = Cli::parse_from([
        "kpcoco",
        path_to_str(&test_folder.join("CollectedData_multi.csv")).unwrap(),
        "--root",
        path_to_str(&root).unwrap(),
        "--out",
        path_to_str(&out).unwrap(),
        "--split",
        "0.67",
    ]);
    let cfg = merge_cli_into_cfg(&cli, cfg::get_default_cfg());
    run(&cli, &cfg).unwrap();
    let train = kclib::read_coco(&with_suffix(&out, "train").unwrap()).unwrap();
    let test = kclib::read_coco(&with_suffix(&out, "test").unwrap()).unwrap();
    assert_eq!(train.images.len(), 2);
    assert_eq!(test.images.len(), 1);
    assert_eq!(train.annotations.len() + test.annotations.len(), 3 * 3);
}
