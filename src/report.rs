//! Rendering of the composite status report.
//!
//! The line order is part of the external contract: consumers scan the
//! report positionally. Severity markup is applied here and nowhere
//! else; probe messages themselves stay plain.

use teia_status_types::{HealthReport, Status, StatusSnapshot};

/// Render the full report, one entry per probe in snapshot order.
///
/// Total: every report contributes its line regardless of status, so a
/// bad cycle produces a report full of bolded failures rather than a
/// short one.
pub fn render(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();
    for report in snapshot.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&render_entry(report));
    }
    out
}

/// Non-`Ok` single-line messages are bolded with Discord markdown.
/// Multi-line messages (the RPC batch, the DAO tally) already carry
/// per-line markers and are rendered verbatim.
fn render_entry(report: &HealthReport) -> String {
    if report.status == Status::Ok || report.message.contains('\n') {
        report.message.clone()
    } else {
        format!("**{}**", report.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teia_status_types::ProbeId;

    #[test]
    fn ok_messages_stay_plain() {
        let report = HealthReport::ok(ProbeId::TeiaSite, "Teia.art is online.");
        assert_eq!(render_entry(&report), "Teia.art is online.");
    }

    #[test]
    fn non_ok_single_lines_are_bolded() {
        let down = HealthReport::down(ProbeId::TeiaSite, "Teia.art is offline.");
        assert_eq!(render_entry(&down), "**Teia.art is offline.**");

        let unknown = HealthReport::unknown(ProbeId::Mempool, "Mempool status cannot be queried.");
        assert_eq!(
            render_entry(&unknown),
            "**Mempool status cannot be queried.**"
        );
    }

    #[test]
    fn multi_line_batches_are_rendered_verbatim() {
        let batch = HealthReport::degraded(
            ProbeId::RpcNodes,
            "RPC nodes status:\n- rpc.tzbeta.net: level=0 time=140ms, status=OK\n- mainnet.teia.rocks: cannot determine status",
        );
        let rendered = render_entry(&batch);
        assert!(!rendered.contains("**"));
        assert_eq!(rendered.lines().count(), 3);
    }

    #[test]
    fn render_joins_entries_in_snapshot_order() {
        let snapshot = StatusSnapshot::with_timestamp(
            1,
            0,
            vec![
                HealthReport::ok(ProbeId::TeiaSite, "Teia.art is online."),
                HealthReport::degraded(
                    ProbeId::TeiaIndexer,
                    "Teia indexer is currently delayed by 60 blocks.",
                ),
                HealthReport::ok(ProbeId::LatestMint, "Latest mint is OBJKT 701552."),
            ],
        );
        let rendered = render(&snapshot);
        assert_eq!(
            rendered,
            "Teia.art is online.\n\
             **Teia indexer is currently delayed by 60 blocks.**\n\
             Latest mint is OBJKT 701552."
        );
    }

    #[test]
    fn placeholder_snapshot_renders_every_probe_bolded() {
        let rendered = render(&StatusSnapshot::pending());
        assert_eq!(rendered.lines().count(), ProbeId::ALL.len());
        assert!(rendered.starts_with("**Teia.art has not been checked yet.**"));
    }

    #[test]
    fn empty_snapshot_renders_to_an_empty_string() {
        let snapshot = StatusSnapshot::with_timestamp(1, 0, Vec::new());
        assert_eq!(render(&snapshot), "");
    }
}
