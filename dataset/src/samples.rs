use crate::error::{DatasetError, Result};

/// Labeled samples in host memory.
///
/// `features` is row-major with `input_dim` values per sample, `labels` is
/// one-hot with `num_classes` values per sample.
#[derive(Clone, Debug)]
pub struct Dataset {
    features: Vec<f32>,
    labels: Vec<u8>,
    input_dim: usize,
    num_classes: usize,
}

impl Dataset {
    /// Builds a dataset from flat features and class indices.
    pub fn from_classes(
        features: Vec<f32>,
        classes: &[usize],
        input_dim: usize,
        num_classes: usize,
    ) -> Result<Self> {
        if features.len() != classes.len() * input_dim {
            return Err(DatasetError::Malformed {
                line: 0,
                reason: format!(
                    "{} feature values for {} samples of width {}",
                    features.len(),
                    classes.len(),
                    input_dim
                ),
            });
        }

        let mut labels = vec![0u8; classes.len() * num_classes];
        for (i, &class) in classes.iter().enumerate() {
            if class >= num_classes {
                return Err(DatasetError::Malformed {
                    line: i + 1,
                    reason: format!("label {} outside 0..{}", class, num_classes),
                });
            }
            labels[i * num_classes + class] = 1;
        }

        Ok(Self {
            features,
            labels,
            input_dim,
            num_classes,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len().checked_div(self.num_classes).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Class index of sample `i`, decoded from its one-hot label.
    pub fn class_of(&self, i: usize) -> Option<usize> {
        let row = &self.labels[i * self.num_classes..(i + 1) * self.num_classes];
        row.iter().position(|&v| v == 1)
    }

    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for i in 0..self.len() {
            if let Some(class) = self.class_of(i) {
                counts[class] += 1;
            }
        }
        counts
    }

    /// Splits off the first `n` samples. Returns `(head, tail)`; the two sets
    /// share no samples.
    pub fn split_at(mut self, n: usize) -> (Dataset, Dataset) {
        let n = n.min(self.len());

        let tail_features = self.features.split_off(n * self.input_dim);
        let tail_labels = self.labels.split_off(n * self.num_classes);

        let tail = Dataset {
            features: tail_features,
            labels: tail_labels,
            input_dim: self.input_dim,
            num_classes: self.num_classes,
        };

        (self, tail)
    }

    pub fn log_stats(&self, name: &str) {
        log::info!(
            "{}: {} samples, {} features, {} classes",
            name,
            self.len(),
            self.input_dim,
            self.num_classes
        );
        log::debug!("{} class counts: {:?}", name, self.class_counts());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Dataset {
        let features = vec![0.0, 0.1, 1.0, 1.1, 2.0, 2.1];
        Dataset::from_classes(features, &[2, 0, 1], 2, 3).unwrap()
    }

    #[test]
    fn test_one_hot_labels() {
        let data = small();

        assert_eq!(data.len(), 3);
        assert_eq!(data.labels(), &[0, 0, 1, 1, 0, 0, 0, 1, 0]);
        assert_eq!(data.class_of(0), Some(2));
        assert_eq!(data.class_counts(), vec![1, 1, 1]);
    }

    #[test]
    fn test_label_out_of_range() {
        let err = Dataset::from_classes(vec![0.0, 0.0], &[0, 3], 1, 3).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_split_is_disjoint() {
        let (head, tail) = small().split_at(1);

        assert_eq!(head.len(), 1);
        assert_eq!(tail.len(), 2);
        assert_eq!(head.features(), &[0.0, 0.1]);
        assert_eq!(tail.features(), &[1.0, 1.1, 2.0, 2.1]);
        assert_eq!(tail.class_of(0), Some(0));
        assert_eq!(tail.class_of(1), Some(1));
    }

    #[test]
    fn test_split_past_end() {
        let (head, tail) = small().split_at(10);

        assert_eq!(head.len(), 3);
        assert!(tail.is_empty());
    }
}
