//! `auto-scale`: recommend and reconcile autoscaler objects

use anyhow::Result;
use monitor_lib::cycle::{CycleReport, PodReport};
use tabled::Tabled;

use super::{build_cycle, CycleOptions};
use crate::config::Paths;
use crate::output::{
    color_direction, color_reconcile, print_json, print_namespace_status, print_rows,
    print_success, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct ScaleRow {
    #[tabled(rename = "Pod Name")]
    pod_name: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
    #[tabled(rename = "Autoscaler")]
    autoscaler: String,
}

impl From<&PodReport> for ScaleRow {
    fn from(pod: &PodReport) -> Self {
        Self {
            pod_name: pod.pod_name.clone(),
            target: pod.scale_target.clone(),
            recommendation: color_direction(
                pod.recommendation.direction,
                &pod.recommendation.to_string(),
            ),
            autoscaler: color_reconcile(&pod.reconcile),
        }
    }
}

pub async fn run(
    paths: &Paths,
    namespace: Option<String>,
    use_mock: bool,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let settings = paths.load_settings()?;
    let options = CycleOptions {
        namespace,
        use_mock,
        reconcile: !dry_run,
        alerts: true,
    };
    let cycle = build_cycle(paths, &settings, &options).await?;
    let report = cycle.run(&options.namespaces(&settings)).await;

    print_report(&report, dry_run, format);
    Ok(())
}

fn print_report(report: &CycleReport, dry_run: bool, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(report);
        return;
    }

    for ns in &report.namespaces {
        print_namespace_status(ns);
        if ns.pods.is_empty() {
            continue;
        }
        let rows: Vec<ScaleRow> = ns.pods.iter().map(ScaleRow::from).collect();
        print_rows(&rows, &ns.pods, format);
    }

    let failures = report.reconcile_failures();
    if failures > 0 {
        print_warning(&format!("{} autoscaler update(s) failed", failures));
    } else if dry_run {
        print_warning("Dry run: no autoscaler objects were changed");
    } else if report.pod_count() > 0 {
        print_success(&format!(
            "Auto-scaling evaluated for {} pods",
            report.pod_count()
        ));
    }
}
