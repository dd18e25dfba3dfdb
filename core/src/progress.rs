use indicatif::{ProgressBar, ProgressStyle};
use network::{BatchView, EpochReport, TrainingObserver};

/// One progress bar per epoch, finished with the evaluation result.
pub struct TrainingProgressBar {
    bar: Option<ProgressBar>,
    style: ProgressStyle,
    epochs: usize,
}

impl TrainingProgressBar {
    pub fn new(epochs: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let style = ProgressStyle::default_bar().template(
            "{spinner:.cyan} {prefix} {pos}/{len} [{wide_bar:.cyan/blue}] {eta_precise} | {msg}",
        )?;
        Ok(Self {
            bar: None,
            style,
            epochs,
        })
    }
}

impl TrainingObserver for TrainingProgressBar {
    fn epoch_started(&mut self, epoch: usize, batches: usize) {
        let bar = ProgressBar::new(batches as u64);
        bar.set_style(self.style.clone());
        bar.set_prefix(format!("epoch {}/{}", epoch, self.epochs));
        self.bar = Some(bar);
    }

    fn batch_finished(&mut self, _batch: &BatchView) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn epoch_finished(&mut self, report: &EpochReport) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!(
                "acc: {:.4}, loss: {:.5}",
                report.accuracy(),
                report.eval.loss
            ));
        }
    }
}
