/// Population mean and standard deviation of a signal.
pub fn calculate_stats(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    if data.is_empty() {
        return (0.0, 0.0);
    }

    let mean = data.iter().sum::<f64>() / n;
    (mean, variance_about(data, mean).sqrt())
}

pub fn mean(data: &[f64]) -> f64 {
    calculate_stats(data).0
}

pub fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    variance_about(data, mean(data))
}

fn variance_about(data: &[f64], mean: f64) -> f64 {
    data.iter()
        .map(|&x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64
}

/// Contact/sound quality indicator on a 0-100 scale from raw-signal variance.
pub fn signal_strength(raw: &[f64], divisor: f64) -> u8 {
    (variance(raw) / divisor).round().clamp(0.0, 100.0) as u8
}
