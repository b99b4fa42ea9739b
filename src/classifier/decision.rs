use crate::inference::{Logits, NUM_CLASSES};

/// Class labels in model output order.
pub const CLASS_LABELS: [&str; NUM_CLASSES] = [
    "type-1", "type-2", "type-3", "type-4", "type-5", "type-6", "type-7",
];

/// The winning class picked from a set of logits.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub index: usize,
    pub label: &'static str,
    pub confidence: f32,
    pub probabilities: [f32; NUM_CLASSES],
}

/// Softmax with the maximum subtracted first so `exp` never overflows.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value, scanning from 0 with a strict `>`.
///
/// On an exact tie the lowest index wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, max)) if v > max => best = Some((i, v)),
            None => best = Some((i, v)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

/// Applies the decision rule: softmax, then first-seen argmax.
pub fn decide(logits: &Logits) -> Decision {
    let probs = softmax(logits.as_slice());
    let mut probabilities = [0.0; NUM_CLASSES];
    probabilities.copy_from_slice(&probs);

    // Logits always hold NUM_CLASSES values, so there is a maximum.
    let index = argmax(&probabilities).unwrap_or(0);
    Decision {
        index,
        label: CLASS_LABELS[index],
        confidence: probabilities[index],
        probabilities,
    }
}
