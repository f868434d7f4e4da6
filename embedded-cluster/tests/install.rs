use embedded_cluster::config::ClusterConfig;
use embedded_cluster::install::{InstallOptions, install, install_preflights};
use embedded_cluster::metrics::MetricsEvent;
use embedded_cluster::preflight::{AnalyzerResult, PreflightOutput, Verdict};
use embedded_cluster_shared::errors::ClusterError;
use embedded_cluster_test_utils::{RecordingMetrics, TestHost};
use tokio_util::sync::CancellationToken;

const HOST_PREFLIGHT: &str = r#"apiVersion: troubleshoot.sh/v1beta2
kind: HostPreflight
metadata:
  name: checks
spec:
  collectors:
    - cpu: {}
  analyzers:
    - cpu:
        outcomes:
          - pass:
              message: enough CPUs
"#;

fn unattended() -> InstallOptions {
    InstallOptions {
        no_prompt: true,
        ..Default::default()
    }
}

fn output(verdict: Verdict) -> PreflightOutput {
    PreflightOutput {
        results: vec![AnalyzerResult {
            verdict,
            title: "CPU".into(),
            message: "cpu check".into(),
        }],
    }
}

#[tokio::test]
async fn test_install_end_to_end() {
    let host = TestHost::new();
    install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap();

    let layout = host.layout();
    let marker = layout.k0s_config_path();
    assert!(marker.exists());
    let cfg = ClusterConfig::from_yaml(&std::fs::read_to_string(&marker).unwrap()).unwrap();
    assert_eq!(cfg.metadata.name, "my-app");

    assert!(layout.k0s_binary_path().exists());
    assert_eq!(
        std::fs::read_link(layout.service_alias_path("my-app")).unwrap(),
        layout.controller_unit_path()
    );

    assert_eq!(
        host.runner.command_lines(),
        vec![
            format!(
                "k0s install controller --enable-worker --no-taints -c {}",
                marker.display()
            ),
            "k0s start".to_string(),
            "systemctl daemon-reload".to_string(),
            "k0s status".to_string(),
        ]
    );
    assert_eq!(host.addons.outros(), 1);
    assert_eq!(host.preflights.runs(), 0);
}

#[tokio::test]
async fn test_install_reports_every_phase() {
    let host = TestHost::new();
    install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap();

    let events = host.metrics.events();
    assert_eq!(events.first(), Some(&MetricsEvent::ApplyStarted));
    assert_eq!(events.last(), Some(&MetricsEvent::ApplyFinished { error: None }));

    let started: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            MetricsEvent::PhaseStarted { phase } => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        started,
        vec![
            "CheckingLicense",
            "Materializing",
            "PreflightGating",
            "ConfigRendering",
            "Installing",
            "PostInstall",
            "WaitingReady",
            "Outro",
        ]
    );

    let ids: std::collections::HashSet<_> =
        host.metrics.targets().iter().map(|t| t.cluster_id).collect();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_already_installed_has_no_side_effects() {
    let host = TestHost::new();
    host.mark_installed();

    let err = install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::AlreadyInstalled { .. }));
    assert!(host.runner.calls().is_empty());
    assert!(host.metrics.events().is_empty());
    assert!(!host.layout().bin_dir().exists());
    assert_eq!(
        std::fs::read_to_string(host.layout().k0s_config_path()).unwrap(),
        "existing"
    );
}

#[tokio::test]
async fn test_failed_preflights_stop_before_config() {
    let host = TestHost::new();
    host.write_release_file("host-preflights/host.yaml", HOST_PREFLIGHT);
    host.preflights.set_output(output(Verdict::Fail));

    let err = install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_preflights_failed());
    assert!(matches!(
        err,
        ClusterError::Phase { phase: "PreflightGating", .. }
    ));
    assert_eq!(host.preflights.runs(), 1);
    assert!(!host.layout().k0s_config_path().exists());
    assert!(host.runner.calls().is_empty());
    assert_eq!(host.terminal.printed().len(), 1);

    let last = host.metrics.events().pop().unwrap();
    assert!(matches!(last, MetricsEvent::ApplyFinished { error: Some(_) }));
}

#[tokio::test]
async fn test_preflight_warning_declined() {
    let host = TestHost::new();
    host.write_release_file("host-preflights/host.yaml", HOST_PREFLIGHT);
    host.preflights.set_output(output(Verdict::Warn));
    host.terminal.answer(false);

    let opts = InstallOptions::default();
    let err = install(&host.ctx, &opts, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), ClusterError::UserAborted));
    assert_eq!(host.terminal.questions(), vec!["Do you want to continue ?"]);
    assert!(!host.layout().k0s_config_path().exists());
}

#[tokio::test]
async fn test_preflight_warning_accepted_without_prompt() {
    let host = TestHost::new();
    host.write_release_file("host-preflights/host.yaml", HOST_PREFLIGHT);
    host.preflights.set_output(output(Verdict::Warn));

    install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(host.terminal.questions().is_empty());
    assert!(host.layout().k0s_config_path().exists());
}

#[tokio::test]
async fn test_user_overrides_win_over_embedded() {
    let host = TestHost::new();
    host.write_release_file(
        "cluster-config.yaml",
        "spec:\n  unsupportedOverrides:\n    k0s: |\n      spec:\n        network:\n          podCIDR: 10.10.0.0/16\n        telemetry:\n          enabled: false\n",
    );
    let overrides = host.write_file(
        "overrides.yaml",
        "spec:\n  unsupportedOverrides:\n    k0s: |\n      spec:\n        network:\n          podCIDR: 10.20.0.0/16\n",
    );

    let opts = InstallOptions {
        overrides: Some(overrides),
        ..unattended()
    };
    install(&host.ctx, &opts, &CancellationToken::new())
        .await
        .unwrap();

    let raw = std::fs::read_to_string(host.layout().k0s_config_path()).unwrap();
    let cfg = ClusterConfig::from_yaml(&raw).unwrap();
    assert_eq!(cfg.spec.network.pod_cidr, "10.20.0.0/16");
    assert!(!cfg.spec.telemetry.enabled);
}

#[tokio::test]
async fn test_release_without_license_is_rejected() {
    let host = TestHost::new();
    host.write_release_file(
        "channel-release.yaml",
        "appSlug: my-app\nchannelID: stable-id\nchannelSlug: stable\nversionLabel: 1.0.0\n",
    );

    let err = install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClusterError::Phase { phase: "CheckingLicense", .. }
    ));
    assert!(matches!(err.root(), ClusterError::License(_)));
    assert!(!host.layout().bin_dir().exists());
}

#[tokio::test]
async fn test_metrics_failure_never_masks_phase_error() {
    let host = TestHost::with_metrics(RecordingMetrics::failing());
    host.runner.fail_on("k0s", "install", 1);

    let err = install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Phase { phase: "Installing", .. }));
    assert!(matches!(err.root(), ClusterError::Command { code: Some(1), .. }));
    assert!(matches!(
        host.metrics.events().last(),
        Some(MetricsEvent::ApplyFinished { error: Some(_) })
    ));
}

#[tokio::test]
async fn test_metrics_failure_does_not_fail_install() {
    let host = TestHost::with_metrics(RecordingMetrics::failing());
    install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_readiness_timeout() {
    let host = TestHost::new();
    host.runner.never_ready();

    let err = install(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Phase { phase: "WaitingReady", .. }));
    assert!(matches!(err.root(), ClusterError::Timeout { .. }));
    assert_eq!(host.addons.outros(), 0);
}

#[tokio::test]
async fn test_cancelled_before_first_phase() {
    let host = TestHost::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = install(&host.ctx, &unattended(), &cancel).await.unwrap_err();

    assert!(matches!(err, ClusterError::Cancelled));
    assert!(host.runner.calls().is_empty());
    assert!(matches!(
        host.metrics.events().last(),
        Some(MetricsEvent::ApplyFinished { error: Some(_) })
    ));
}

#[tokio::test]
async fn test_run_preflights_only() {
    let host = TestHost::new();
    host.write_release_file("host-preflights/host.yaml", HOST_PREFLIGHT);
    host.preflights.set_output(output(Verdict::Pass));

    install_preflights(&host.ctx, &unattended(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(host.preflights.runs(), 1);
    assert!(host.layout().materialized_binary("k0s").exists());
    assert!(!host.layout().k0s_config_path().exists());
    assert!(host.runner.calls().is_empty());
    assert!(host.metrics.events().is_empty());
}
