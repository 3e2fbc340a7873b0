use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use super::table::Table;
use crate::config::DataSplitConfig;
use crate::error::{DataVersionError, Result};

/// The three partitions of a split
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions {
    pub train: Table,
    pub val: Table,
    pub test: Table,
}

impl Partitions {
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.train.len(), self.val.len(), self.test.len())
    }
}

/// Read the cleansed CSV, split it and write the three partition CSVs
pub fn split_file(config: &DataSplitConfig) -> Result<Partitions> {
    let table = Table::read_csv(&config.cleansed_data_save_path)?;
    let partitions = split(table, config)?;

    partitions.train.write_csv(&config.train_data_save_path)?;
    partitions.val.write_csv(&config.val_data_save_path)?;
    partitions.test.write_csv(&config.test_data_save_path)?;

    let (train, val, test) = partitions.sizes();
    info!(train, val, test, seed = config.seed, "data split");
    Ok(partitions)
}

/// Split a table into train, validation and test partitions.
///
/// The label column is moved last. Test takes `ceil(test_frac * n)` rows of a
/// seeded permutation; validation takes `ceil(val_frac * m)` of the `m` rows
/// left, reshuffled with the same seed; train keeps the rest.
pub fn split(mut table: Table, config: &DataSplitConfig) -> Result<Partitions> {
    table.move_column_to_end(&config.label_col)?;

    let mut indices: Vec<usize> = (0..table.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(config.seed));
    let n_test = partition_size(indices.len(), config.test_frac);
    let (test_idx, pool) = indices.split_at(n_test.min(indices.len()));

    let mut pool = pool.to_vec();
    pool.shuffle(&mut StdRng::seed_from_u64(config.seed));
    let n_val = partition_size(pool.len(), config.val_frac);
    let (val_idx, train_idx) = pool.split_at(n_val.min(pool.len()));

    let partitions = Partitions {
        train: table.select_rows(train_idx),
        val: table.select_rows(val_idx),
        test: table.select_rows(test_idx),
    };

    for (name, part) in [
        ("train", &partitions.train),
        ("validation", &partitions.val),
        ("test", &partitions.test),
    ] {
        if part.is_empty() {
            return Err(DataVersionError::data(format!(
                "{} partition would be empty with {} rows (test_frac {}, val_frac {})",
                name,
                table.len(),
                config.test_frac,
                config.val_frac
            )));
        }
    }

    Ok(partitions)
}

fn partition_size(n: usize, frac: f64) -> usize {
    (frac * n as f64).ceil() as usize
}
