//! Named phases of a bootstrap run.

/// One step of the install or join sequence.
///
/// ```text
/// CheckingLicense → Materializing → PreflightGating → ConfigRendering
///     → Installing → PostInstall → WaitingReady → Outro
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    CheckingLicense,
    Materializing,
    PreflightGating,
    ConfigRendering,
    Installing,
    PostInstall,
    WaitingReady,
    Outro,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::CheckingLicense => "CheckingLicense",
            Phase::Materializing => "Materializing",
            Phase::PreflightGating => "PreflightGating",
            Phase::ConfigRendering => "ConfigRendering",
            Phase::Installing => "Installing",
            Phase::PostInstall => "PostInstall",
            Phase::WaitingReady => "WaitingReady",
            Phase::Outro => "Outro",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Full local install.
pub const INSTALL_PHASES: &[Phase] = &[
    Phase::CheckingLicense,
    Phase::Materializing,
    Phase::PreflightGating,
    Phase::ConfigRendering,
    Phase::Installing,
    Phase::PostInstall,
    Phase::WaitingReady,
    Phase::Outro,
];

/// Joining an existing cluster. The outro belongs to the first node only.
pub const JOIN_PHASES: &[Phase] = &[
    Phase::Materializing,
    Phase::PreflightGating,
    Phase::ConfigRendering,
    Phase::Installing,
    Phase::PostInstall,
    Phase::WaitingReady,
];

/// `run-preflights`: gate the host without committing to anything.
pub const PREFLIGHT_PHASES: &[Phase] = &[Phase::Materializing, Phase::PreflightGating];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_install_without_license_and_outro() {
        let expected: Vec<Phase> = INSTALL_PHASES
            .iter()
            .copied()
            .filter(|p| !matches!(p, Phase::CheckingLicense | Phase::Outro))
            .collect();
        assert_eq!(JOIN_PHASES, expected.as_slice());
    }

    #[test]
    fn test_preflight_phases_are_a_prefix_of_join() {
        assert!(JOIN_PHASES.starts_with(PREFLIGHT_PHASES));
    }
}
