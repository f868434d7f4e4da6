use embedded_cluster::VERSION;
use embedded_cluster::join::{JoinOptions, join, join_preflights};
use embedded_cluster::metrics::MetricsEvent;
use embedded_cluster::net::ProxySpec;
use embedded_cluster_shared::errors::ClusterError;
use embedded_cluster_test_utils::{StubTokenSource, TestHost, join_command};
use tokio_util::sync::CancellationToken;

const URL: &str = "10.0.0.1:30000";
const WORKER: &str = "/usr/local/bin/k0s install worker --no-taints";
const CONTROLLER: &str = "/usr/local/bin/k0s install controller --enable-worker --no-taints";

fn unattended() -> JoinOptions {
    JoinOptions {
        no_prompt: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_worker_join() {
    let host = TestHost::new();
    let cmd = join_command(VERSION, WORKER);
    let tokens = StubTokenSource::new(cmd.clone());

    join(&host.ctx, &tokens, URL, "token", &unattended(), &CancellationToken::new())
        .await
        .unwrap();

    let layout = host.layout();
    let token_file = layout.join_token_path();
    assert_eq!(std::fs::read_to_string(&token_file).unwrap(), "join-secret");
    assert!(layout.k0s_config_path().exists());
    assert_eq!(
        std::fs::read_link(layout.service_alias_path("my-app")).unwrap(),
        layout.worker_unit_path()
    );

    assert_eq!(
        host.runner.command_lines(),
        vec![
            format!("k0s install worker --no-taints --token-file {}", token_file.display()),
            "k0s start".to_string(),
            "systemctl daemon-reload".to_string(),
            "k0s status".to_string(),
        ]
    );
    assert_eq!(host.addons.outros(), 0);
    assert_eq!(tokens.calls(), 1);
}

#[tokio::test]
async fn test_controller_join_passes_config() {
    let host = TestHost::new();
    let tokens = StubTokenSource::new(join_command(VERSION, CONTROLLER));

    join(&host.ctx, &tokens, URL, "token", &unattended(), &CancellationToken::new())
        .await
        .unwrap();

    let install = &host.runner.command_lines()[0];
    assert!(install.starts_with("k0s install controller --enable-worker --no-taints --token-file "));
    assert!(install.ends_with(&format!("-c {}", host.layout().k0s_config_path().display())));
    assert_eq!(
        std::fs::read_link(host.layout().service_alias_path("my-app")).unwrap(),
        host.layout().controller_unit_path()
    );
}

#[tokio::test]
async fn test_join_reports_against_cluster() {
    let host = TestHost::new();
    let mut cmd = join_command(VERSION, WORKER);
    cmd.installation_spec.metrics_base_url = "https://metrics.example".into();
    let tokens = StubTokenSource::new(cmd.clone());

    join(&host.ctx, &tokens, URL, "token", &unattended(), &CancellationToken::new())
        .await
        .unwrap();

    let events = host.metrics.events();
    assert!(matches!(events.first(), Some(MetricsEvent::JoinStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(MetricsEvent::JoinFinished { error: None, .. })
    ));
    for target in host.metrics.targets() {
        assert_eq!(target.cluster_id, cmd.cluster_id);
        assert_eq!(target.base_url, "https://metrics.example");
    }
}

#[tokio::test]
async fn test_version_mismatch_touches_nothing() {
    let host = TestHost::new();
    let tokens = StubTokenSource::new(join_command("1.2.3-other", WORKER));

    let err = join(&host.ctx, &tokens, URL, "token", &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClusterError::VersionMismatch { binary, cluster } => {
            assert_eq!(binary, VERSION);
            assert_eq!(cluster, "1.2.3-other");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(host.runner.calls().is_empty());
    assert!(host.metrics.events().is_empty());
    assert!(!host.layout().k0s_config_path().exists());
    assert!(!host.layout().bin_dir().exists());
}

#[tokio::test]
async fn test_already_installed_skips_fetch() {
    let host = TestHost::new();
    host.mark_installed();
    let tokens = StubTokenSource::new(join_command(VERSION, WORKER));

    let err = join(&host.ctx, &tokens, URL, "token", &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::AlreadyInstalled { .. }));
    assert_eq!(tokens.calls(), 0);
}

#[tokio::test]
async fn test_bad_admin_console_address() {
    let host = TestHost::new();
    let tokens = StubTokenSource::new(join_command(VERSION, WORKER));

    let err = join(&host.ctx, &tokens, "10.0.0.1", "token", &unattended(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Config(_)));
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn test_proxy_not_covering_node() {
    let host = TestHost::new();
    let mut cmd = join_command(VERSION, WORKER);
    cmd.installation_spec.proxy = Some(ProxySpec {
        http_proxy: "http://proxy:3128".into(),
        https_proxy: "http://proxy:3128".into(),
        no_proxy: "10.0.0.0/8".into(),
    });
    let tokens = StubTokenSource::new(cmd);
    let opts = JoinOptions {
        network_interface: Some("lo".into()),
        ..unattended()
    };

    let err = join(&host.ctx, &tokens, URL, "token", &opts, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClusterError::ProxyNotExempt { local_ip, .. } => assert_eq!(local_ip, "127.0.0.1"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn test_proxy_reaches_child_processes_only() {
    let host = TestHost::new();
    let mut cmd = join_command(VERSION, WORKER);
    cmd.installation_spec.proxy = Some(ProxySpec {
        http_proxy: "http://proxy:3128".into(),
        https_proxy: String::new(),
        no_proxy: "127.0.0.0/8".into(),
    });
    let tokens = StubTokenSource::new(cmd);
    let opts = JoinOptions {
        network_interface: Some("lo".into()),
        ..unattended()
    };

    join(&host.ctx, &tokens, URL, "token", &opts, &CancellationToken::new())
        .await
        .unwrap();

    let calls = host.runner.calls();
    let install = &calls[0];
    assert!(install
        .envs
        .contains(&("HTTP_PROXY".to_string(), "http://proxy:3128".to_string())));
    assert!(!install.envs.iter().any(|(k, _)| k == "HTTPS_PROXY"));
    assert!(std::env::var("HTTP_PROXY").map(|v| v != "http://proxy:3128").unwrap_or(true));
}

#[tokio::test]
async fn test_cancelled_fetch() {
    let host = TestHost::new();
    let tokens = StubTokenSource::pending();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = join(&host.ctx, &tokens, URL, "token", &unattended(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Cancelled));
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn test_enable_ha_on_controller() {
    let host = TestHost::new();
    let tokens = StubTokenSource::new(join_command(VERSION, CONTROLLER));
    let opts = JoinOptions {
        enable_ha: true,
        ..unattended()
    };

    join(&host.ctx, &tokens, URL, "token", &opts, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(host.addons.promotions(), 1);
    let ctx = host.addons.last_context().unwrap();
    assert_eq!(ctx.kubeconfig, host.layout().kubeconfig_path());
}

#[tokio::test]
async fn test_enable_ha_declined() {
    let host = TestHost::new();
    host.terminal.answer(false);
    let tokens = StubTokenSource::new(join_command(VERSION, CONTROLLER));
    let opts = JoinOptions {
        enable_ha: true,
        ..Default::default()
    };

    join(&host.ctx, &tokens, URL, "token", &opts, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(host.addons.promotions(), 0);
    assert_eq!(
        host.terminal.questions(),
        vec!["Do you want to enable high availability?"]
    );
}

#[tokio::test]
async fn test_enable_ha_ignored_on_worker() {
    let host = TestHost::new();
    let tokens = StubTokenSource::new(join_command(VERSION, WORKER));
    let opts = JoinOptions {
        enable_ha: true,
        ..unattended()
    };

    join(&host.ctx, &tokens, URL, "token", &opts, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(host.addons.promotions(), 0);
}

#[tokio::test]
async fn test_ha_failure_keeps_join() {
    let host = TestHost::new();
    host.addons.fail_promotion();
    let tokens = StubTokenSource::new(join_command(VERSION, CONTROLLER));
    let opts = JoinOptions {
        enable_ha: true,
        ..unattended()
    };

    let err = join(&host.ctx, &tokens, URL, "token", &opts, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Phase { phase: "HaPromotion", .. }));
    assert!(host.layout().k0s_config_path().exists());
    assert!(matches!(
        host.metrics.events().last(),
        Some(MetricsEvent::JoinFinished { error: None, .. })
    ));
}

#[tokio::test]
async fn test_join_preflights_only() {
    let host = TestHost::new();
    let tokens = StubTokenSource::new(join_command(VERSION, WORKER));

    join_preflights(&host.ctx, &tokens, URL, "token", &unattended(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(host.layout().materialized_binary("k0s").exists());
    assert!(!host.layout().k0s_config_path().exists());
    assert!(host.runner.calls().is_empty());
    assert!(host.metrics.events().is_empty());
}
