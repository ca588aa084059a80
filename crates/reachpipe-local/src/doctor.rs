//! Environment health: per-adapter checks rolled up into one report.
//!
//! Upstream availability checks were written independently per backend and
//! return free-form prose (often mixed-language). Rather than forcing every
//! integration to emit structured flags, a single inference pass extracts a
//! structured approximation from each (status, message) pair using an
//! explicit keyword table. Best-effort by design, and documented as such.

use reachpipe_core::{Config, HealthSignals, HealthStatus, Registry, Signal, Tier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-signal trigger substrings. Matching is case-insensitive and
/// substring-based; negative markers are always consulted before positive
/// ones so "not configured" never reads as "configured". Defaults cover the
/// English messages this crate emits plus the Chinese markers the upstream
/// tools emit.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    pub not_installed: Vec<String>,
    pub install_hint: Vec<String>,
    pub not_configured: Vec<String>,
    pub configured: Vec<String>,
    pub connection_failed: Vec<String>,
    pub not_authenticated: Vec<String>,
    pub authenticated: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            not_installed: owned(&["not installed", "not found", "未安装"]),
            install_hint: owned(&["install", "安装"]),
            not_configured: owned(&[
                "not configured",
                "no proxy",
                "not authenticated",
                "not logged in",
                "scan the qr",
                "未配置",
                "无代理",
                "需扫码登录",
                "未认证",
                "未登录",
            ]),
            configured: owned(&[
                "configured",
                "fully available",
                "ready",
                "can read",
                "can extract",
                "已配置",
                "完整可用",
                "可提取",
                "可读取",
                "可用",
            ]),
            connection_failed: owned(&["connection failed", "call failed", "failed", "连接异常", "调用异常", "失败"]),
            not_authenticated: owned(&[
                "not logged in",
                "not authenticated",
                "scan the qr",
                "cookie",
                "未登录",
                "未认证",
                "需扫码登录",
            ]),
            authenticated: owned(&["logged in", "fully available", "已登录", "完整可用"]),
        }
    }
}

/// Keyword table plus the set of adapters that have a login concept at all.
#[derive(Debug, Clone)]
pub struct SignalRules {
    pub keywords: KeywordTable,
    pub login_adapters: Vec<String>,
}

impl Default for SignalRules {
    fn default() -> Self {
        Self {
            keywords: KeywordTable::default(),
            login_adapters: owned(&["github", "twitter", "xiaohongshu", "linkedin", "bosszhipin"]),
        }
    }
}

fn matches_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// Turn one adapter's (status, message) pair into four independent signals.
pub fn infer_signals(
    rules: &SignalRules,
    adapter: &str,
    status: HealthStatus,
    message: &str,
) -> HealthSignals {
    let msg = message.to_lowercase();
    let kw = &rules.keywords;

    let mut installed = Signal::Yes;
    if matches_any(&msg, &kw.not_installed) {
        installed = Signal::No;
    }
    if status == HealthStatus::Off && matches_any(&msg, &kw.install_hint) {
        installed = Signal::No;
    }

    // Precondition chaining: an uninstalled tool cannot be configured.
    let configured = if installed == Signal::No {
        Signal::No
    } else if matches_any(&msg, &kw.not_configured) {
        Signal::No
    } else if matches_any(&msg, &kw.configured) {
        Signal::Yes
    } else {
        Signal::Unknown
    };

    let reachable = match status {
        HealthStatus::Ok => Signal::Yes,
        HealthStatus::Warn => {
            if matches_any(&msg, &kw.connection_failed) {
                Signal::No
            } else {
                Signal::Yes
            }
        }
        HealthStatus::Off | HealthStatus::Error => Signal::No,
    };

    let authenticated = if !rules.login_adapters.iter().any(|a| a == adapter) {
        Signal::NotApplicable
    } else if matches_any(&msg, &kw.not_authenticated) {
        Signal::No
    } else if matches_any(&msg, &kw.authenticated) {
        Signal::Yes
    } else {
        Signal::Unknown
    };

    HealthSignals {
        installed,
        configured,
        reachable,
        authenticated,
    }
}

/// One row of the aggregated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterHealth {
    pub status: HealthStatus,
    pub description: String,
    pub message: String,
    pub tier: Tier,
    pub backends: Vec<String>,
    pub signals: HealthSignals,
}

/// Check every registered adapter and collect results by name.
///
/// Checks run concurrently as spawned tasks. A check that errors — or
/// panics — is reported as status `error` with the failure text; one broken
/// adapter never prevents the others from reporting.
pub async fn check_all(registry: &Registry, config: &Config) -> BTreeMap<String, AdapterHealth> {
    let rules = SignalRules::default();
    let mut handles = Vec::new();
    for adapter in registry.iter() {
        let adapter = Arc::clone(adapter);
        let config = config.clone();
        handles.push((
            adapter.name().to_string(),
            adapter.description().to_string(),
            adapter.tier(),
            adapter.backends().iter().map(|b| b.to_string()).collect::<Vec<_>>(),
            tokio::spawn(async move { adapter.check(&config).await }),
        ));
    }

    let mut results = BTreeMap::new();
    for (name, description, tier, backends, handle) in handles {
        let (status, message) = match handle.await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => (HealthStatus::Error, e.to_string()),
            Err(join_err) => (HealthStatus::Error, format!("check panicked: {join_err}")),
        };
        let signals = infer_signals(&rules, &name, status, &message);
        results.insert(
            name,
            AdapterHealth {
                status,
                description,
                message,
                tier,
                backends,
                signals,
            },
        );
    }
    results
}

fn signal_icon(s: Signal) -> &'static str {
    match s {
        Signal::Yes => "✅",
        Signal::No => "❌",
        Signal::Unknown => "❓",
        Signal::NotApplicable => "➖",
    }
}

pub fn signal_badge(signals: &HealthSignals) -> String {
    format!(
        "[I:{} C:{} R:{} A:{}]",
        signal_icon(signals.installed),
        signal_icon(signals.configured),
        signal_icon(signals.reachable),
        signal_icon(signals.authenticated),
    )
}

fn status_icon(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => "✅",
        HealthStatus::Warn => "⚠️ ",
        HealthStatus::Off | HealthStatus::Error => "❌",
    }
}

fn render_group(lines: &mut Vec<String>, heading: &str, rows: Vec<(&String, &AdapterHealth)>) {
    if rows.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(heading.to_string());
    for (_, r) in rows {
        // Multi-line remediation messages are indented under their row.
        let message = r.message.replace('\n', "\n      ");
        lines.push(format!(
            "  {} {} {} — {}",
            status_icon(r.status),
            r.description,
            signal_badge(&r.signals),
            message
        ));
    }
}

/// Render the aggregated results as a grouped text report. Presentation
/// only; the grouping and the active count are the contract.
pub fn format_report(results: &BTreeMap<String, AdapterHealth>) -> String {
    let mut lines = vec![
        "👁️  reachpipe status".to_string(),
        "=".repeat(40),
        "Legend: I=installed C=configured R=reachable A=authenticated".to_string(),
    ];

    let ok_count = results
        .values()
        .filter(|r| r.status == HealthStatus::Ok)
        .count();
    let total = results.len();

    let by_tier = |tier: Tier| -> Vec<(&String, &AdapterHealth)> {
        results.iter().filter(|(_, r)| r.tier == tier).collect()
    };

    render_group(&mut lines, "Ready out of the box:", by_tier(Tier::ZeroConfig));
    render_group(
        &mut lines,
        "Needs a free credential:",
        by_tier(Tier::FreeCredential),
    );
    render_group(&mut lines, "Needs manual setup:", by_tier(Tier::ManualSetup));

    lines.push(String::new());
    lines.push(format!("Status: {ok_count}/{total} adapters active"));
    if ok_count < total {
        lines.push("Run `reachpipe doctor` after installing a tool to re-check".to_string());
    }
    lines.join("\n")
}
