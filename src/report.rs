use std::fmt;

use fecase::pipeline::PipelineOutcome;
use fecase::{CaseConfig, Displacement, Force};

/// Numbers worth printing once a run has finished.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Model the job was built from.
    pub model: String,
    /// Job name.
    pub job: String,
    /// Final job state.
    pub state: String,
    /// Result artifact location.
    pub artifact: String,
    /// Step closed by the last frame.
    pub step: Option<String>,
    /// Displacement at the report probe.
    pub probe: Option<Displacement>,
    /// Largest displacement magnitude.
    pub max_displacement: Option<f64>,
    /// Sum of reaction forces.
    pub reaction: Option<Force>,
}

impl RunSummary {
    /// Collect the summary of a finished pipeline run.
    #[must_use]
    pub fn from_outcome(outcome: &PipelineOutcome, config: &CaseConfig) -> Self {
        let result = outcome.result();
        let frame = result.and_then(|result| result.last_frame());
        Self {
            model: outcome.case.name().to_owned(),
            job: outcome.job.name().to_owned(),
            state: outcome.job.state().to_string(),
            artifact: outcome.artifact.display().to_string(),
            step: frame.map(|frame| frame.step.clone()),
            probe: outcome.probe_displacement(config),
            max_displacement: result.and_then(|result| result.max_displacement()),
            reaction: frame.map(|frame| frame.total_reaction()),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Scientific notation keeps small deflections comparable with hand
        // calculations such as https://en.wikipedia.org/wiki/Euler%E2%80%93Bernoulli_beam_theory
        writeln!(f, "Model `{}`, job `{}` {}", self.model, self.job, self.state)?;
        writeln!(f, "Result artifact: {}", self.artifact)?;
        match &self.step {
            Some(step) => writeln!(f, "Last frame: {step}")?,
            None => writeln!(f, "Last frame: none written")?,
        }
        match self.probe {
            Some(u) => writeln!(
                f,
                "Displacement at probe: ux = {:+.3e} m, uy = {:+.3e} m, uz = {:+.3e} m",
                u.x, u.y, u.z
            )?,
            None => writeln!(f, "Displacement at probe: not requested")?,
        }
        if let Some(max) = self.max_displacement {
            writeln!(f, "Largest displacement magnitude: {max:.3e} m")?;
        }
        if let Some(r) = self.reaction {
            write!(
                f,
                "Total reaction: RF1 = {:+.3e} N, RF2 = {:+.3e} N, RF3 = {:+.3e} N",
                r.x, r.y, r.z
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_human_readable_report() {
        let summary = RunSummary {
            model: "Cantilever Beam".to_owned(),
            job: "CantileverBeamJob".to_owned(),
            state: "completed".to_owned(),
            artifact: "work/CantileverBeamJob.json".to_owned(),
            step: Some("Apply Load".to_owned()),
            probe: Some(Displacement::new(0.0, -5.859e-6, 0.0)),
            max_displacement: Some(5.859e-6),
            reaction: Some(Force::new(0.0, 10.0, 0.0)),
        };
        let report = summary.to_string();
        assert!(report.contains("job `CantileverBeamJob` completed"));
        assert!(report.contains("uy = -5.859e-6 m"));
        assert!(report.contains("RF2 = +1.000e1 N"));
    }

    #[test]
    fn missing_values_are_named() {
        let summary = RunSummary {
            model: "Cantilever Beam".to_owned(),
            job: "Check".to_owned(),
            state: "completed".to_owned(),
            artifact: "work/Check.json".to_owned(),
            step: None,
            probe: None,
            max_displacement: None,
            reaction: None,
        };
        let report = summary.to_string();
        assert!(report.contains("Last frame: none written"));
        assert!(report.contains("not requested"));
        assert!(!report.contains("Total reaction"));
    }
}
