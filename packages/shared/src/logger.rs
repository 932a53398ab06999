//! Tracing bootstrap for Kaiwa binaries.
//!
//! Without `RUST_LOG` the filter admits these targets at the requested level:
//! the `kaiwa_server` library, this crate, the running binary and
//! `tower_http` (request spans from the router's trace layer). Everything
//! else stays silent.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG`, when set, replaces the default directives.
///
/// ```ignore
/// use kaiwa_shared::logger::setup_logger;
///
/// setup_logger(env!("CARGO_BIN_NAME"), "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(binary_name, default_log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Binary names use `-`, tracing targets use `_`.
fn default_directives(binary_name: &str, level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut targets = vec!["kaiwa_server", "kaiwa_shared", "tower_http"];
    if !targets.contains(&binary_target.as_str()) {
        targets.insert(2, binary_target.as_str());
    }
    targets
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_engine_targets() {
        // テスト項目: 既定のフィルタはエンジン・共有クレート・バイナリ・tower_http を対象にする
        // given (前提条件):
        let binaries = ["kaiwa-server", "kaiwa-admin"];

        // when (操作):
        let directives: Vec<String> = binaries
            .iter()
            .map(|b| default_directives(b, "debug"))
            .collect();

        // then (期待する結果):
        // ライブラリと同名のバイナリは重複させない
        assert_eq!(
            directives[0],
            "kaiwa_server=debug,kaiwa_shared=debug,tower_http=debug"
        );
        assert_eq!(
            directives[1],
            "kaiwa_server=debug,kaiwa_shared=debug,kaiwa_admin=debug,tower_http=debug"
        );
    }
}
