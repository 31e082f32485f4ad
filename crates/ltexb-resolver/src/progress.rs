//! Weighted nested progress reporting.
//!
//! A [`ProgressStack`] holds a stack of task frames. Each frame claims a
//! weight of its parent's remaining span; the visible fraction is computed
//! by folding the stack from the innermost frame outward. Frames must be
//! finished in strict reverse order of starting.

/// Observer for cumulative progress updates, injected by the host.
pub trait ProgressListener: Send {
    fn on_progress(&mut self, fraction: f64, label: &str);
}

/// Listener that discards all updates.
pub struct NullListener;

impl ProgressListener for NullListener {
    fn on_progress(&mut self, _fraction: f64, _label: &str) {}
}

/// Adapter turning a closure into a [`ProgressListener`].
pub struct FnListener<F: FnMut(f64, &str) + Send>(pub F);

impl<F: FnMut(f64, &str) + Send> ProgressListener for FnListener<F> {
    fn on_progress(&mut self, fraction: f64, label: &str) {
        (self.0)(fraction, label)
    }
}

struct Frame {
    label: String,
    weight: f64,
    /// Own completion: finished-child weights plus direct updates.
    fraction: f64,
}

pub struct ProgressStack {
    frames: Vec<Frame>,
    listener: Box<dyn ProgressListener>,
}

impl ProgressStack {
    pub fn new(label: impl Into<String>, listener: Box<dyn ProgressListener>) -> Self {
        Self {
            frames: vec![Frame {
                label: label.into(),
                weight: 1.0,
                fraction: 0.0,
            }],
            listener,
        }
    }

    /// Push a frame claiming `weight` of the parent's remaining span.
    pub fn start_task(&mut self, weight: f64, label: impl Into<String>) {
        self.frames.push(Frame {
            label: label.into(),
            weight,
            fraction: 0.0,
        });
        self.emit();
    }

    /// Set the current frame's internal completion in `[0, 1]`.
    pub fn update(&mut self, fraction: f64, label: Option<&str>) {
        let top = self
            .frames
            .last_mut()
            .expect("update called with no open task");
        top.fraction = fraction.clamp(0.0, 1.0);
        if let Some(label) = label {
            top.label = label.to_string();
        }
        self.emit();
    }

    /// Pop the current frame and credit its weight to the parent.
    ///
    /// Panics when no started task remains; finishing out of order is a
    /// contract violation, not a runtime condition.
    pub fn finish_task(&mut self) {
        if self.frames.len() < 2 {
            panic!("finish_task called with no open task");
        }
        let frame = self.frames.pop().expect("checked above");
        let parent = self.frames.last_mut().expect("root frame always present");
        parent.fraction = (parent.fraction + frame.weight).clamp(0.0, 1.0);
        self.emit();
    }

    /// Cumulative completion, folded from the innermost frame outward:
    /// `v(i) = fraction(i) + weight(i+1) * v(i+1)`.
    pub fn fraction(&self) -> f64 {
        let mut value = 0.0;
        for (depth, frame) in self.frames.iter().enumerate().rev() {
            if depth == self.frames.len() - 1 {
                value = frame.fraction;
            } else {
                let child_weight = self.frames[depth + 1].weight;
                value = frame.fraction + child_weight * value;
            }
        }
        value.clamp(0.0, 1.0)
    }

    fn emit(&mut self) {
        let fraction = self.fraction();
        let label = self
            .frames
            .last()
            .expect("root frame always present")
            .label
            .clone();
        self.listener.on_progress(fraction, &label);
    }
}
