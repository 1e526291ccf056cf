//! Running statistics checked against batch recomputation from raw samples

use mss_core::{CompletionRecord, Execute, Executor, SimulationConfig, SimulationEngine, SourceId};
use std::collections::HashMap;

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn sample_variance(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    samples.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (samples.len() - 1) as f64
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn welford_matches_batch_after_every_completion() {
    let config = SimulationConfig::default().with_seed(5);
    let mut engine = SimulationEngine::from_config(&config).unwrap();
    let mut samples: HashMap<SourceId, Vec<CompletionRecord>> = HashMap::new();

    Executor::to_completion()
        .side_effect(|engine, report| {
            let Some(record) = report.completion else {
                return;
            };
            let seen = samples.entry(record.source).or_default();
            seen.push(record);

            let stats = engine.source_statistics(record.source).unwrap();
            let waiting: Vec<f64> = seen.iter().map(|r| r.waiting.as_secs_f64()).collect();
            let service: Vec<f64> = seen.iter().map(|r| r.service.as_secs_f64()).collect();

            assert_eq!(stats.completed, seen.len() as u64);
            assert!(close(stats.waiting.mean(), mean(&waiting)));
            assert!(close(stats.service.mean(), mean(&service)));
            assert!(close(stats.waiting.variance(), sample_variance(&waiting)));
            assert!(close(stats.service.variance(), sample_variance(&service)));
            if stats.completed > 1 {
                let n = stats.completed as f64;
                assert_eq!(stats.service.variance(), stats.service.sum_sq_diff() / (n - 1.0));
            } else {
                assert_eq!(stats.service.variance(), 0.0);
            }
        })
        .execute(&mut engine)
        .unwrap();

    assert_eq!(samples.len(), 3, "every source should complete something");
}

#[test]
fn completion_times_are_consistent() {
    let mut engine = SimulationEngine::from_config(&SimulationConfig::default().with_seed(11)).unwrap();
    Executor::to_completion()
        .side_effect(|_, report| {
            if let Some(record) = report.completion {
                assert_eq!(record.time_in_system, record.waiting + record.service);
            }
        })
        .execute(&mut engine)
        .unwrap();

    let report = engine.report();
    for row in &report.sources {
        assert!(row.mean_time_in_system + 1e-9 >= row.mean_waiting);
        assert!(row.rejection_probability >= 0.0 && row.rejection_probability <= 1.0);
    }
    let completed: u64 = report.servers.iter().map(|s| s.completed).sum();
    assert_eq!(completed, report.totals.completed);
}

#[test]
fn sample_means_follow_configured_means() {
    // long horizon, fast servers: nearly everything completes
    let config = SimulationConfig::default()
        .with_seed(3)
        .with_horizon(200_000.0)
        .with_buffer_capacity(20)
        .with_shared_service_time(2.0);
    let mut engine = SimulationEngine::from_config(&config).unwrap();
    engine.execute(Executor::to_completion()).unwrap();

    for (source, stats) in config.sources.iter().zip(engine.statistics()) {
        let expected = config.horizon / source.mean_interval;
        let generated = stats.generated as f64;
        assert!((generated - expected).abs() / expected < 0.05, "{generated} vs {expected}");
        assert!((stats.service.mean() - 2.0).abs() < 0.1);
        assert_eq!(stats.rejected, 0);
    }
}
