//! Defines the Component trait, used by each per-measurement processing
//! stage. This enforces a common interface between stages, so that each
//! stage can consume the output of the preceding one, process it, and pass
//! new data to the next stage of the conversion pipeline.

use log::trace;

/// A left/right impulse response pair travelling through the stages.
pub type StereoIr = (Vec<f32>, Vec<f32>);

///
/// A stage in the conversion pipeline, which performs one step of the
/// resample / normalize / window process. Stages hold no per-measurement
/// state, so the same stage can be applied to every measurement in turn.
///
pub trait Component: ToString {
    /// What the stage consumes
    type InData;
    /// What the stage produces
    type OutData;

    /// Converts an input of type InData into an output of type OutData
    fn convert(&mut self, input: Self::InData) -> Self::OutData;
}

/// A boxed stereo stage, as stored in a [StageChain].
pub type StereoStage = Box<dyn Component<InData = StereoIr, OutData = StereoIr>>;

/// An ordered list of stereo stages, applied front to back.
#[derive(Default)]
pub struct StageChain {
    stages: Vec<StereoStage>,
}

impl StageChain {
    /// An empty chain, which passes its input through untouched.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the end of the chain.
    pub fn then(mut self, stage: StereoStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Names of the stages, in order.
    pub fn names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.to_string()).collect()
    }

    /// Run one impulse response pair through every stage.
    pub fn process(&mut self, input: StereoIr) -> StereoIr {
        self.stages.iter_mut().fold(input, |data, stage| {
            trace!("{} : {} samples in", stage.to_string(), data.0.len());
            stage.convert(data)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends a marker to both channels
    struct MockComponent {
        marker: f32,
    }

    impl MockComponent {
        fn new(marker: f32) -> Self {
            Self { marker }
        }
    }

    impl Component for MockComponent {
        type InData = StereoIr;
        type OutData = StereoIr;

        fn convert(&mut self, input: StereoIr) -> StereoIr {
            let (mut l, mut r) = input;
            l.push(self.marker);
            r.push(-self.marker);
            (l, r)
        }
    }

    impl ToString for MockComponent {
        fn to_string(&self) -> String {
            format!("MockComponent({})", self.marker)
        }
    }

    #[test]
    fn test_mock_component() {
        let mut mock_comp = MockComponent::new(1.0);
        assert_eq!(
            mock_comp.convert((vec![], vec![])),
            (vec![1.0], vec![-1.0])
        );
    }

    #[test]
    fn test_chained_component() {
        let mut chain = StageChain::new()
            .then(Box::new(MockComponent::new(1.0)))
            .then(Box::new(MockComponent::new(2.0)));

        assert_eq!(
            chain.names(),
            vec!["MockComponent(1)".to_string(), "MockComponent(2)".to_string()]
        );
        assert_eq!(
            chain.process((vec![0.0], vec![0.0])),
            (vec![0.0, 1.0, 2.0], vec![0.0, -1.0, -2.0])
        );
    }

    #[test]
    fn empty_chain_passes_through() {
        let mut chain = StageChain::new();
        assert_eq!(
            chain.process((vec![0.5], vec![0.25])),
            (vec![0.5], vec![0.25])
        );
    }
}
