use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file doesn't exist.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save a baseline to a JSON file.
pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare current results against a baseline. Returns a list of regressions
/// (scene name, percent change) where the threshold is exceeded.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<(String, f64)> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline.results.iter().find(|b| {
            b.scene_name == result.scene_name
                && b.resolution == result.resolution
                && b.cascade_count == result.cascade_count
        }) else {
            continue;
        };
        if base.timings.mean_ms <= 0.0 {
            continue;
        }
        let pct_change =
            (result.timings.mean_ms - base.timings.mean_ms) / base.timings.mean_ms * 100.0;
        if pct_change > threshold_pct {
            regressions.push((result.scene_name.clone(), pct_change));
        }
    }

    regressions
}

/// Format results as a markdown summary table, followed by extraction
/// statistics when any scene has them.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Grid | Triangles | Refreshes | Mean (ms) | Median (ms) | P95 (ms) | Min (ms) | Max (ms) |\n");
    out.push_str("|-------|------|-----------|-----------|-----------|-------------|----------|----------|----------|\n");

    for r in results {
        out.push_str(&format!(
            "| {} | {}^3 x {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
            r.scene_name,
            r.resolution,
            r.cascade_count,
            r.triangle_count,
            r.refresh_count,
            r.timings.mean_ms,
            r.timings.median_ms,
            r.timings.p95_ms,
            r.timings.min_ms,
            r.timings.max_ms,
        ));
    }

    let extracted: Vec<_> = results
        .iter()
        .filter_map(|r| r.extraction.as_ref().map(|e| (r.scene_name.as_str(), e)))
        .collect();
    if !extracted.is_empty() {
        out.push_str("\n| Scene | Cascade | Occupied voxels | Mean light |\n");
        out.push_str("|-------|---------|-----------------|------------|\n");
        for (scene, e) in extracted {
            out.push_str(&format!(
                "| {} | {} | {} | {:.3} |\n",
                scene, e.cascade, e.occupied_voxels, e.mean_light
            ));
        }
    }

    let overlays: Vec<_> = results
        .iter()
        .flat_map(|r| r.overlays.iter().map(|o| (r.scene_name.as_str(), o)))
        .collect();
    if !overlays.is_empty() {
        out.push_str("\n| Scene | Overlay | Cubes | Line vertices |\n");
        out.push_str("|-------|---------|-------|---------------|\n");
        for (scene, o) in overlays {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                scene, o.volume, o.cubes, o.line_vertices
            ));
        }
    }

    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[(String, f64)], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for (scene, pct) in regressions {
        out.push_str(&format!("  - {}: +{:.1}%\n", scene, pct));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{ExtractionSummary, OverlaySummary, TimingSeries};

    fn result(name: &str, mean_ms: f64) -> BenchmarkResult {
        BenchmarkResult {
            scene_name: name.to_string(),
            resolution: 32,
            cascade_count: 4,
            triangle_count: 194,
            refresh_count: 10,
            allocation_events: 1,
            timings: TimingSeries {
                mean_ms,
                median_ms: mean_ms,
                p95_ms: mean_ms,
                min_ms: mean_ms,
                max_ms: mean_ms,
            },
            extraction: None,
            overlays: Vec::new(),
        }
    }

    #[test]
    fn test_compare_flags_regression() {
        let baseline = Baseline {
            timestamp: "t".into(),
            results: vec![result("boxes", 10.0), result("ground", 10.0)],
        };
        let current = vec![result("boxes", 12.0), result("ground", 10.5)];
        let regressions = compare(&current, &baseline, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].0, "boxes");
        assert!((regressions[0].1 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_skips_different_grid() {
        let mut base = result("boxes", 1.0);
        base.resolution = 64;
        let baseline = Baseline {
            timestamp: "t".into(),
            results: vec![base],
        };
        assert!(compare(&[result("boxes", 5.0)], &baseline, 10.0).is_empty());
    }

    #[test]
    fn test_markdown_includes_extraction_table() {
        let mut r = result("boxes", 1.0);
        assert!(!format_markdown(&[r.clone()]).contains("Occupied voxels"));
        r.extraction = Some(ExtractionSummary {
            cascade: 1,
            occupied_voxels: 42,
            mean_light: 0.75,
        });
        let md = format_markdown(&[r]);
        assert!(md.contains("| boxes | 1 | 42 | 0.750 |"));
        assert!(md.contains("32^3 x 4"));
    }

    #[test]
    fn test_markdown_includes_overlay_table() {
        let mut r = result("boxes", 1.0);
        r.overlays.push(OverlaySummary {
            volume: "light-volume".into(),
            cubes: 3,
            line_vertices: 78,
        });
        assert!(format_markdown(&[r]).contains("| boxes | light-volume | 3 | 78 |"));
    }

    #[test]
    fn test_missing_baseline_is_none() {
        let path = std::env::temp_dir().join("voxcast-bench-no-such-baseline.json");
        assert!(load_baseline(&path).is_none());
    }

    #[test]
    fn test_baseline_without_overlays_loads() {
        let json = r#"{"timestamp":"t","results":[{"scene_name":"ground","resolution":32,
            "cascade_count":4,"triangle_count":2,"refresh_count":10,"allocation_events":1,
            "timings":{"mean_ms":1.0,"median_ms":1.0,"p95_ms":1.0,"min_ms":1.0,"max_ms":1.0},
            "extraction":null}]}"#;
        let baseline: Baseline = serde_json::from_str(json).unwrap();
        assert!(baseline.results[0].overlays.is_empty());
    }

    #[test]
    fn test_json_roundtrip_keeps_extraction() {
        let mut r = result("boxes", 1.0);
        r.extraction = Some(ExtractionSummary {
            cascade: 0,
            occupied_voxels: 7,
            mean_light: 0.5,
        });
        let baseline = Baseline {
            timestamp: "t".into(),
            results: vec![r],
        };
        let json = serde_json::to_string(&baseline).unwrap();
        let back: Baseline = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results[0].extraction, baseline.results[0].extraction);
    }
}
