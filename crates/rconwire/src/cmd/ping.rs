use std::time::Instant;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tracing::warn;

use crate::cmd::{connect, parse_duration, PingArgs, ServerArgs};
use crate::exit::{CliError, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{millis, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct PingSample {
    seq: u32,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rtt_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PingSummary {
    server: String,
    command: String,
    sent: u32,
    ok: u32,
    failed: u32,
    loss_pct: f64,
    min_ms: Option<f64>,
    avg_ms: Option<f64>,
    max_ms: Option<f64>,
    samples: Vec<PingSample>,
}

pub async fn run(args: PingArgs, server: &ServerArgs, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::usage("count must be greater than zero"));
    }
    if args.command.trim().is_empty() {
        return Err(CliError::usage("command must not be empty"));
    }
    let interval = parse_duration(&args.interval)?;

    let client = connect(server).await?;
    let address = client.server_address();
    if format == OutputFormat::Pretty {
        println!("PING {address} using {:?}", args.command);
    }

    let mut samples = Vec::with_capacity(args.count as usize);
    for seq in 1..=args.count {
        let started = Instant::now();
        let sample = match client.send_command(&args.command).await {
            Ok(_) => PingSample {
                seq,
                ok: true,
                rtt_ms: Some(millis(started.elapsed())),
                error: None,
            },
            Err(err) => {
                warn!(seq, error = %err, "round trip failed");
                PingSample {
                    seq,
                    ok: false,
                    rtt_ms: None,
                    error: Some(err.to_string()),
                }
            }
        };
        if format == OutputFormat::Pretty {
            match (&sample.rtt_ms, &sample.error) {
                (Some(rtt), _) => println!("seq={seq} time={rtt:.2}ms"),
                (None, Some(err)) => println!("seq={seq} failed: {err}"),
                (None, None) => {}
            }
        }
        samples.push(sample);

        if seq < args.count {
            tokio::time::sleep(interval).await;
        }
    }
    client.disconnect().await;

    let summary = summarize(address, args.command, samples);
    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Pretty => println!("{}", summary_table(&summary)),
        OutputFormat::Raw => println!(
            "{} {} {:.2}",
            summary.ok,
            summary.sent,
            summary.avg_ms.unwrap_or(0.0)
        ),
    }

    if summary.failed > 0 {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn summarize(server: String, command: String, samples: Vec<PingSample>) -> PingSummary {
    let rtts: Vec<f64> = samples.iter().filter_map(|s| s.rtt_ms).collect();
    let sent = samples.len() as u32;
    let ok = rtts.len() as u32;
    let failed = sent - ok;
    let loss_pct = if sent == 0 {
        0.0
    } else {
        (f64::from(failed) / f64::from(sent) * 1000.0).round() / 10.0
    };
    let avg_ms = (!rtts.is_empty())
        .then(|| (rtts.iter().sum::<f64>() / rtts.len() as f64 * 100.0).round() / 100.0);

    PingSummary {
        server,
        command,
        sent,
        ok,
        failed,
        loss_pct,
        min_ms: rtts.iter().copied().reduce(f64::min),
        avg_ms,
        max_ms: rtts.iter().copied().reduce(f64::max),
        samples,
    }
}

fn summary_table(summary: &PingSummary) -> Table {
    let ms = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["SERVER", "SENT", "OK", "LOSS", "MIN ms", "AVG ms", "MAX ms"])
        .add_row(vec![
            summary.server.clone(),
            summary.sent.to_string(),
            summary.ok.to_string(),
            format!("{:.1}%", summary.loss_pct),
            ms(summary.min_ms),
            ms(summary.avg_ms),
            ms(summary.max_ms),
        ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u32, rtt_ms: Option<f64>) -> PingSample {
        PingSample {
            seq,
            ok: rtt_ms.is_some(),
            rtt_ms,
            error: rtt_ms.is_none().then(|| "request 3 timed out after 5s".to_string()),
        }
    }

    #[test]
    fn summary_statistics() {
        let summary = summarize(
            "127.0.0.1:25575".into(),
            "list".into(),
            vec![
                sample(1, Some(2.0)),
                sample(2, None),
                sample(3, Some(4.5)),
                sample(4, Some(1.0)),
            ],
        );
        assert_eq!(summary.sent, 4);
        assert_eq!(summary.ok, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.loss_pct, 25.0);
        assert_eq!(summary.min_ms, Some(1.0));
        assert_eq!(summary.max_ms, Some(4.5));
        assert_eq!(summary.avg_ms, Some(2.5));
    }

    #[test]
    fn all_failed_has_no_timings() {
        let summary = summarize(
            "h:1".into(),
            "list".into(),
            vec![sample(1, None), sample(2, None)],
        );
        assert_eq!(summary.ok, 0);
        assert_eq!(summary.loss_pct, 100.0);
        assert_eq!(summary.avg_ms, None);
        assert_eq!(summary.min_ms, None);
    }

    #[test]
    fn table_renders_summary() {
        let summary = summarize("h:1".into(), "list".into(), vec![sample(1, Some(3.25))]);
        let rendered = summary_table(&summary).to_string();
        assert!(rendered.contains("AVG ms"));
        assert!(rendered.contains("3.25"));
        assert!(rendered.contains("0.0%"));
    }

    #[test]
    fn summary_serializes_samples() {
        let summary = summarize(
            "h:1".into(),
            "list".into(),
            vec![sample(1, Some(1.5)), sample(2, None)],
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["samples"][0]["rtt_ms"], 1.5);
        assert!(json["samples"][0].get("error").is_none());
        assert_eq!(json["samples"][1]["ok"], false);
    }
}
