//! The doctor surface must work offline: every check either inspects the
//! local environment (PATH lookups, config presence) or fails fast.

#[test]
fn doctor_json_covers_every_builtin_adapter() {
    let bin = assert_cmd::cargo::cargo_bin!("reachpipe");
    let out = std::process::Command::new(bin)
        .args(["doctor", "--output", "json"])
        .env_remove("EXA_API_KEY")
        .env_remove("REACHPIPE_EXA_API_KEY")
        .output()
        .expect("run reachpipe doctor");

    assert!(out.status.success(), "reachpipe doctor failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse doctor json");
    let map = v.as_object().expect("doctor output is an object");

    for name in [
        "github",
        "reddit",
        "twitter",
        "youtube",
        "bilibili",
        "instagram",
        "xiaohongshu",
        "linkedin",
        "wechat-mp",
        "bosszhipin",
        "rss",
        "exa",
        "web",
    ] {
        let row = map.get(name).unwrap_or_else(|| panic!("missing row: {name}"));
        assert!(row["status"].is_string(), "{name} status");
        assert!(row["message"].is_string(), "{name} message");
        assert!(row["tier"].is_u64(), "{name} tier");
        assert!(row["backends"].is_array(), "{name} backends");
        for signal in ["installed", "configured", "reachable", "authenticated"] {
            assert!(row["signals"][signal].is_string(), "{name} signal {signal}");
        }
    }

    // Zero-config adapters are healthy in any environment.
    assert_eq!(map["web"]["status"].as_str(), Some("ok"));
    assert_eq!(map["rss"]["status"].as_str(), Some("ok"));
    // Exa without a key must warn, not error.
    assert_eq!(map["exa"]["status"].as_str(), Some("warn"));
}

#[test]
fn doctor_text_report_groups_by_tier() {
    let bin = assert_cmd::cargo::cargo_bin!("reachpipe");
    let out = std::process::Command::new(bin)
        .args(["doctor"])
        .output()
        .expect("run reachpipe doctor");

    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.contains("Ready out of the box:"), "report: {s}");
    assert!(s.contains("Needs a free credential:"));
    assert!(s.contains("Needs manual setup:"));
    assert!(s.contains("adapters active"));
}
