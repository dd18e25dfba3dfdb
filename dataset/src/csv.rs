use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DatasetError, Result};
use crate::samples::Dataset;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub input_dim: usize,
    pub num_classes: usize,
    /// Stop after this many samples.
    pub max_samples: Option<usize>,
    /// Raw feature values are divided by this.
    pub feature_scale: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            input_dim: 784,
            num_classes: 10,
            max_samples: Some(60_000),
            feature_scale: 255.0,
        }
    }
}

impl Dataset {
    /// Loads a `label,f1,f2,...` CSV file.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let file = File::open(path).map_err(|source| DatasetError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let dataset = Self::read(BufReader::new(file), options)?;
        log::info!("Loaded {} samples from {}", dataset.len(), path.display());

        if let Some(max) = options.max_samples {
            if dataset.len() < max {
                log::warn!(
                    "{} holds {} samples, fewer than the {} requested",
                    path.display(),
                    dataset.len(),
                    max
                );
            }
        }

        Ok(dataset)
    }

    /// Reads samples from CSV text. A first line without a single numeric
    /// field is treated as a header and skipped.
    pub fn read<R: BufRead>(reader: R, options: &LoadOptions) -> Result<Self> {
        let scale = options.feature_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DatasetError::InvalidScale(scale));
        }

        let limit = options.max_samples.unwrap_or(usize::MAX);

        let mut lines: Vec<(usize, String)> = Vec::new();
        for (idx, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if idx == 0 && is_header(trimmed) {
                log::debug!("Skipping header line");
                continue;
            }
            if lines.len() >= limit {
                break;
            }
            lines.push((idx + 1, line));
        }

        if lines.is_empty() {
            return Err(DatasetError::Empty);
        }

        let rows: Vec<(usize, Vec<f32>)> = lines
            .par_iter()
            .map(|(line_no, line)| parse_line(*line_no, line, options))
            .collect::<Result<_>>()?;

        let mut features = Vec::with_capacity(rows.len() * options.input_dim);
        let mut classes = Vec::with_capacity(rows.len());
        for (class, values) in rows {
            classes.push(class);
            features.extend_from_slice(&values);
        }

        Dataset::from_classes(features, &classes, options.input_dim, options.num_classes)
    }
}

fn is_header(line: &str) -> bool {
    line.split(',').all(|field| field.trim().parse::<f32>().is_err())
}

fn parse_line(line_no: usize, line: &str, options: &LoadOptions) -> Result<(usize, Vec<f32>)> {
    let malformed = |reason: String| DatasetError::Malformed {
        line: line_no,
        reason,
    };

    let mut fields = line.trim().split(',');

    let label_str = fields.next().unwrap_or("").trim();
    let label: usize = label_str
        .parse()
        .map_err(|_| malformed(format!("label {:?} is not an integer", label_str)))?;
    if label >= options.num_classes {
        return Err(malformed(format!(
            "label {} outside 0..{}",
            label, options.num_classes
        )));
    }

    let mut values = Vec::with_capacity(options.input_dim);
    for field in fields {
        let field = field.trim();
        let value: f32 = field
            .parse()
            .map_err(|_| malformed(format!("feature {:?} is not a number", field)))?;
        values.push(value / options.feature_scale);
    }

    if values.len() != options.input_dim {
        return Err(malformed(format!(
            "{} features, expected {}",
            values.len(),
            options.input_dim
        )));
    }

    Ok((label, values))
}
