use std::{collections::HashMap, fmt::Display, fs::File, io, path::Path};

use kpcoco_domain::{kcerr, to_kc, KcResult, Keypoint, TPtF};
use tracing::{debug, info};

/// Individual of all columns in tables without an individuals level
pub const SINGLE: &str = "single";

const LEVEL_SCORER: &str = "scorer";
const LEVEL_INDIVIDUALS: &str = "individuals";
const LEVEL_BODYPARTS: &str = "bodyparts";
const LEVEL_COORDS: &str = "coords";

/// Identifies the image of a row as a sequence of path segments relative to the project root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowKey {
    segments: Vec<String>,
}
impl RowKey {
    pub fn new(segments: Vec<String>) -> KcResult<Self> {
        if segments.is_empty() {
            Err(kcerr!("a row key needs at least one path segment"))
        } else {
            let segments = segments
                .into_iter()
                .map(|s| s.replace('\\', "/"))
                .collect();
            Ok(Self { segments })
        }
    }
    pub fn from_path(path: &str) -> Self {
        Self {
            segments: vec![path.replace('\\', "/")],
        }
    }
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}
impl Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnKey {
    pub scorer: String,
    pub individual: Option<String>,
    pub bodypart: String,
    pub coord: String,
}
impl ColumnKey {
    pub fn new(scorer: &str, individual: Option<&str>, bodypart: &str, coord: &str) -> Self {
        Self {
            scorer: scorer.to_string(),
            individual: individual.map(|i| i.to_string()),
            bodypart: bodypart.to_string(),
            coord: coord.to_string(),
        }
    }
    pub fn individual(&self) -> &str {
        self.individual.as_deref().unwrap_or(SINGLE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schema {
    /// no individuals level, all columns belong to [`SINGLE`]
    Single,
    MultiIndividual,
}

/// Column positions of the `x` and `y` coordinates of one body part
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XyColumns {
    pub x: usize,
    pub y: usize,
}

/// Labeled keypoints with one row per image. Columns are keyed by
/// `(scorer, individual, bodypart, coord)`, missing values are `NaN`.
#[derive(Clone, Debug, PartialEq)]
pub struct KeypointTable {
    index: Vec<RowKey>,
    columns: Vec<ColumnKey>,
    values: Vec<Vec<TPtF>>,
}

fn unique_in_order<'a>(it: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut uniques: Vec<&str> = vec![];
    for s in it {
        if !uniques.contains(&s) {
            uniques.push(s);
        }
    }
    uniques
}

impl KeypointTable {
    pub fn new(
        index: Vec<RowKey>,
        columns: Vec<ColumnKey>,
        values: Vec<Vec<TPtF>>,
    ) -> KcResult<Self> {
        if index.len() != values.len() {
            return Err(kcerr!(
                "{} row keys but {} rows of values",
                index.len(),
                values.len()
            ));
        }
        if let Some((row_idx, row)) = values
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(kcerr!(
                "row {} of {} has {} values but there are {} columns",
                row_idx,
                index[row_idx],
                row.len(),
                columns.len()
            ));
        }
        let n_with_individual = columns.iter().filter(|c| c.individual.is_some()).count();
        if n_with_individual > 0 && n_with_individual < columns.len() {
            return Err(kcerr!(
                "either all or no columns need an individual, {} of {} have one",
                n_with_individual,
                columns.len()
            ));
        }
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    pub fn schema(&self) -> Schema {
        if self.columns.iter().any(|c| c.individual.is_some()) {
            Schema::MultiIndividual
        } else {
            Schema::Single
        }
    }

    /// Inserts the individual [`SINGLE`] into all columns of a table without individuals.
    pub fn normalize(&mut self) {
        if self.schema() == Schema::Single {
            debug!(
                "inserting individual '{SINGLE}' into {} columns",
                self.columns.len()
            );
            for c in &mut self.columns {
                c.individual = Some(SINGLE.to_string());
            }
        }
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }
    pub fn index(&self) -> &[RowKey] {
        &self.index
    }
    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }
    pub fn value(&self, row: usize, col: usize) -> TPtF {
        self.values[row][col]
    }

    /// Unique individuals in order of first appearance
    pub fn individuals(&self) -> Vec<&str> {
        unique_in_order(self.columns.iter().map(|c| c.individual()))
    }

    /// Unique body parts of an individual in order of first appearance
    pub fn bodyparts(&self, individual: &str) -> Vec<&str> {
        unique_in_order(
            self.columns
                .iter()
                .filter(|c| c.individual() == individual)
                .map(|c| c.bodypart.as_str()),
        )
    }

    /// Position of the first row that has the same key as `row`. The first occurrence wins
    /// for duplicate keys.
    pub fn first_occurrences(&self) -> Vec<usize> {
        let mut first_rows: HashMap<&RowKey, usize> = HashMap::new();
        self.index
            .iter()
            .enumerate()
            .map(|(row, key)| *first_rows.entry(key).or_insert(row))
            .collect()
    }

    /// Keys that label more than one row, each listed once
    pub fn duplicate_keys(&self) -> Vec<&RowKey> {
        let mut counts: HashMap<&RowKey, usize> = HashMap::new();
        for key in &self.index {
            *counts.entry(key).or_insert(0) += 1;
        }
        let mut dups = vec![];
        for key in &self.index {
            if counts[key] > 1 && !dups.contains(&key) {
                dups.push(key);
            }
        }
        dups
    }

    /// Columns of the coordinates of each body part of the individual. Other coordinates such
    /// as likelihoods are skipped.
    pub fn xy_columns(&self, individual: &str) -> KcResult<Vec<XyColumns>> {
        let find = |bodypart: &str, coord: &str| {
            self.columns
                .iter()
                .position(|c| {
                    c.individual() == individual && c.bodypart == bodypart && c.coord == coord
                })
                .ok_or_else(|| {
                    kcerr!(
                        "no column for coordinate {} of {} of individual {}",
                        coord,
                        bodypart,
                        individual
                    )
                })
        };
        self.bodyparts(individual)
            .into_iter()
            .map(|bp| {
                Ok(XyColumns {
                    x: find(bp, "x")?,
                    y: find(bp, "y")?,
                })
            })
            .collect()
    }

    pub fn keypoints_at(&self, row: usize, xy_columns: &[XyColumns]) -> Vec<Keypoint> {
        xy_columns
            .iter()
            .map(|xy| Keypoint::from_coords(self.value(row, xy.x), self.value(row, xy.y)))
            .collect()
    }

    pub fn keypoints(&self, row: usize, individual: &str) -> KcResult<Vec<Keypoint>> {
        let xy_columns = self.xy_columns(individual)?;
        Ok(self.keypoints_at(row, &xy_columns))
    }

    pub fn from_csv_path(path: &Path) -> KcResult<Self> {
        let file =
            File::open(path).map_err(|e| kcerr!("could not open {:?} due to {:?}", path, e))?;
        let table = Self::from_csv_reader(file)
            .map_err(|e| kcerr!("could not read keypoint table {:?}. {}", path, e.msg()))?;
        info!(
            "read {} rows and {} columns from {path:?}",
            table.n_rows(),
            table.columns.len()
        );
        Ok(table)
    }

    /// Reads the csv layout of labeled data. The header consists of the rows `scorer`,
    /// optionally `individuals`, `bodyparts`, and `coords`. The number of leading empty cells
    /// in the scorer row determines how many index columns make up a row key. Tables without
    /// individuals are normalized to the individual [`SINGLE`].
    pub fn from_csv_reader<R: io::Read>(rdr: R) -> KcResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(rdr);
        let records = reader
            .records()
            .collect::<Result<Vec<csv::StringRecord>, _>>()
            .map_err(to_kc)?;
        let is_header = |r: &csv::StringRecord| {
            matches!(
                r.get(0).map(str::trim),
                Some(LEVEL_SCORER | LEVEL_INDIVIDUALS | LEVEL_BODYPARTS | LEVEL_COORDS)
            )
        };
        let n_header_rows = records.iter().take_while(|r| is_header(r)).count();
        let (header, data) = records.split_at(n_header_rows);
        let level = |name: &str| header.iter().find(|r| r.get(0).map(str::trim) == Some(name));

        let scorer_row =
            level(LEVEL_SCORER).ok_or_else(|| kcerr!("missing header row {}", LEVEL_SCORER))?;
        let n_index_cols = 1 + scorer_row
            .iter()
            .skip(1)
            .take_while(|cell| cell.trim().is_empty())
            .count();
        let bodyparts_row =
            level(LEVEL_BODYPARTS).ok_or_else(|| kcerr!("missing header row {}", LEVEL_BODYPARTS))?;
        let coords_row =
            level(LEVEL_COORDS).ok_or_else(|| kcerr!("missing header row {}", LEVEL_COORDS))?;
        let individuals_row = level(LEVEL_INDIVIDUALS);

        let n_cols = scorer_row.len().saturating_sub(n_index_cols);
        let cell = |r: &csv::StringRecord, name: &str, col: usize| {
            r.get(n_index_cols + col)
                .map(|c| c.trim().to_string())
                .ok_or_else(|| kcerr!("header row {} has no entry for column {}", name, col))
        };
        let columns = (0..n_cols)
            .map(|col| {
                let individual = individuals_row
                    .map(|r| cell(r, LEVEL_INDIVIDUALS, col))
                    .transpose()?;
                Ok(ColumnKey {
                    scorer: cell(scorer_row, LEVEL_SCORER, col)?,
                    individual,
                    bodypart: cell(bodyparts_row, LEVEL_BODYPARTS, col)?,
                    coord: cell(coords_row, LEVEL_COORDS, col)?,
                })
            })
            .collect::<KcResult<Vec<_>>>()?;

        let mut index = Vec::with_capacity(data.len());
        let mut values = Vec::with_capacity(data.len());
        for (row_idx, r) in data.iter().enumerate() {
            if r.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let segments = r
                .iter()
                .take(n_index_cols)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect::<Vec<_>>();
            let row_key = RowKey::new(segments)
                .map_err(|e| kcerr!("data row {}: {}", row_idx, e.msg()))?;
            index.push(row_key);
            let row_values = r
                .iter()
                .skip(n_index_cols)
                .map(|v| {
                    let v = v.trim();
                    if v.is_empty() {
                        Ok(TPtF::NAN)
                    } else {
                        v.parse::<TPtF>().map_err(|e| {
                            kcerr!(
                                "could not parse '{}' in data row {} due to {:?}",
                                v,
                                row_idx,
                                e
                            )
                        })
                    }
                })
                .collect::<KcResult<Vec<_>>>()?;
            values.push(row_values);
        }
        let mut table = Self::new(index, columns, values)?;
        table.normalize();
        Ok(table)
    }
}

#[cfg(test)]
pub(crate) fn make_test_table_single() -> KeypointTable {
    let columns = vec![
        ColumnKey::new("alice", None, "head", "x"),
        ColumnKey::new("alice", None, "head", "y"),
        ColumnKey::new("alice", None, "tail", "x"),
        ColumnKey::new("alice", None, "tail", "y"),
    ];
    let index = vec![RowKey::from_path("labeled-data/v1/img0.png")];
    let values = vec![vec![1.0, 2.0, TPtF::NAN, TPtF::NAN]];
    KeypointTable::new(index, columns, values).unwrap()
}

#[cfg(test)]
pub(crate) fn make_test_table_multi() -> KeypointTable {
    let mut columns = vec![];
    for ind in ["mus1", "mus2"] {
        for bp in ["snout", "tailbase"] {
            for coord in ["x", "y"] {
                columns.push(ColumnKey::new("bob", Some(ind), bp, coord));
            }
        }
    }
    for coord in ["x", "y"] {
        columns.push(ColumnKey::new("bob", Some(SINGLE), "corner", coord));
    }
    let index = ["img0.png", "img1.png", "img0.png"]
        .iter()
        .map(|name| {
            RowKey::new(vec![
                "labeled-data".to_string(),
                "v1".to_string(),
                name.to_string(),
            ])
            .unwrap()
        })
        .collect();
    let nan = TPtF::NAN;
    let values = vec![
        vec![10.0, 20.0, 30.0, 40.0, nan, nan, nan, nan, 5.0, 5.0],
        vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, nan, nan],
        vec![99.0, 99.0, 99.0, 99.0, 99.0, 99.0, 99.0, 99.0, 99.0, 99.0],
    ];
    KeypointTable::new(index, columns, values).unwrap()
}

#[test]
fn test_schema() {
    let mut table = make_test_table_single();
    assert_eq!(table.schema(), Schema::Single);
    assert_eq!(table.individuals(), vec![SINGLE]);
    table.normalize();
    assert_eq!(table.schema(), Schema::MultiIndividual);
    assert_eq!(table.individuals(), vec![SINGLE]);
    assert_eq!(table.bodyparts(SINGLE), vec!["head", "tail"]);

    let table = make_test_table_multi();
    assert_eq!(table.schema(), Schema::MultiIndividual);
    assert_eq!(table.individuals(), vec!["mus1", "mus2", SINGLE]);
    assert_eq!(table.bodyparts("mus2"), vec!["snout", "tailbase"]);
    assert_eq!(table.bodyparts(SINGLE), vec!["corner"]);
    assert!(table.bodyparts("cat").is_empty());
}

#[test]
fn test_mixed_individual_levels() {
    let columns = vec![
        ColumnKey::new("alice", Some("mus1"), "head", "x"),
        ColumnKey::new("alice", None, "head", "y"),
    ];
    let index = vec![RowKey::from_path("a.png")];
    let res = KeypointTable::new(index, columns, vec![vec![0.0, 0.0]]);
    assert!(res.is_err());
}

#[test]
fn test_row_length_mismatch() {
    let columns = vec![ColumnKey::new("alice", None, "head", "x")];
    let index = vec![RowKey::from_path("a.png")];
    let res = KeypointTable::new(index, columns, vec![vec![0.0, 0.0]]);
    assert!(res.is_err());
    assert!(RowKey::new(vec![]).is_err());
}

#[test]
fn test_duplicates() {
    let table = make_test_table_multi();
    assert_eq!(table.first_occurrences(), vec![0, 1, 0]);
    let dups = table.duplicate_keys();
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].to_string(), "labeled-data/v1/img0.png");
    assert!(make_test_table_single().duplicate_keys().is_empty());
}

#[test]
fn test_keypoints() {
    let table = make_test_table_multi();
    let kps = table.keypoints(0, "mus1").unwrap();
    assert_eq!(kps.len(), 2);
    assert!(kps.iter().all(|kp| kp.is_visible()));
    assert_eq!(kps[1].pos, (30.0, 40.0).into());
    let kps = table.keypoints(0, "mus2").unwrap();
    assert!(kps.iter().all(|kp| !kp.is_visible()));
    let kps = table.keypoints(1, SINGLE).unwrap();
    assert_eq!(kps.len(), 1);
    assert!(!kps[0].is_visible());
}

#[test]
fn test_missing_coordinate_column() {
    let columns = vec![
        ColumnKey::new("alice", None, "head", "x"),
        ColumnKey::new("alice", None, "head", "likelihood"),
    ];
    let index = vec![RowKey::from_path("a.png")];
    let table = KeypointTable::new(index, columns, vec![vec![0.0, 0.9]]).unwrap();
    assert!(table.keypoints(0, SINGLE).is_err());
}

#[test]
fn test_likelihood_ignored() {
    let columns = vec![
        ColumnKey::new("net", None, "head", "x"),
        ColumnKey::new("net", None, "head", "y"),
        ColumnKey::new("net", None, "head", "likelihood"),
    ];
    let index = vec![RowKey::from_path("a.png")];
    let table = KeypointTable::new(index, columns, vec![vec![3.0, 4.0, 0.9]]).unwrap();
    assert_eq!(table.xy_columns(SINGLE).unwrap(), vec![XyColumns { x: 0, y: 1 }]);
    let kps = table.keypoints(0, SINGLE).unwrap();
    assert_eq!(kps[0].pos, (3.0, 4.0).into());
}

#[test]
fn test_from_csv_single_index() {
    let csv_str = "scorer,alice,alice,alice,alice
bodyparts,head,head,tail,tail
coords,x,y,x,y
labeled-data\\v1\\img0.png,1.5,2,,
labeled-data/v1/img1.png,3,4,5,6
";
    let table = KeypointTable::from_csv_reader(csv_str.as_bytes()).unwrap();
    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.individuals(), vec![SINGLE]);
    assert!(table
        .columns()
        .iter()
        .all(|c| c.individual.as_deref() == Some(SINGLE)));
    assert_eq!(table.index()[0].segments(), ["labeled-data/v1/img0.png"]);
    assert_eq!(table.value(0, 0), 1.5);
    assert!(table.value(0, 2).is_nan());
    assert_eq!(table.value(1, 3), 6.0);
}

#[test]
fn test_from_csv_multi_index() {
    let csv_str = "scorer,,,bob,bob,bob,bob
individuals,,,mus1,mus1,mus2,mus2
bodyparts,,,snout,snout,snout,snout
coords,,,x,y,x,y
labeled-data,v1,img0.png,1,2,3,4
labeled-data,v1,img1.png,,,7,8
";
    let table = KeypointTable::from_csv_reader(csv_str.as_bytes()).unwrap();
    assert_eq!(table.schema(), Schema::MultiIndividual);
    assert_eq!(table.individuals(), vec!["mus1", "mus2"]);
    assert_eq!(
        table.index()[1].segments(),
        ["labeled-data", "v1", "img1.png"]
    );
    let kps = table.keypoints(1, "mus1").unwrap();
    assert!(!kps[0].is_visible());
    let kps = table.keypoints(1, "mus2").unwrap();
    assert_eq!(kps[0].pos, (7.0, 8.0).into());
}

#[test]
fn test_from_csv_errors() {
    let no_coords = "scorer,alice\nbodyparts,head\nimg.png,1\n";
    assert!(KeypointTable::from_csv_reader(no_coords.as_bytes()).is_err());
    let not_a_number = "scorer,alice\nbodyparts,head\ncoords,x\nimg.png,abc\n";
    assert!(KeypointTable::from_csv_reader(not_a_number.as_bytes()).is_err());
    let too_many = "scorer,alice\nbodyparts,head\ncoords,x\nimg.png,1,2\n";
    assert!(KeypointTable::from_csv_reader(too_many.as_bytes()).is_err());
}

#[test]
fn test_from_csv_header_only() {
    let csv_str = "scorer,,,bob,bob
individuals,,,mus1,mus1
bodyparts,,,snout,snout
coords,,,x,y
";
    let table = KeypointTable::from_csv_reader(csv_str.as_bytes()).unwrap();
    assert_eq!(table.n_rows(), 0);
    assert_eq!(table.individuals(), vec!["mus1"]);
    assert!(table.first_occurrences().is_empty());
    assert!(table.duplicate_keys().is_empty());
}
