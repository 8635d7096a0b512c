//! End-to-end export from segment files to record files.

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use approx::assert_abs_diff_eq;
use nalgebra::Vector3;
use radiometry::{IntegrationMethod, LightSource, PowerModel, TrajectorySample};

use gesture_export::{
    ExportConfig, ExportRecord, GestureExporter, GestureRequest, InMemorySegmentSource,
    JsonRecordWriter, JsonSegmentSource, RecordWriter, Segment, WriteError,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn lamp() -> LightSource {
    LightSource::new(Vector3::new(0.0, 10.0, 0.0), 2.0, Vector3::y()).unwrap()
}

/// Receiver sweeping sideways under the lamp at 1.0 below it, facing up
fn sweep(gesture: &str, index: usize, offset: f64) -> Segment {
    let samples: Vec<TrajectorySample> = (0..8)
        .map(|i| {
            let x = offset + 0.25 * i as f64;
            TrajectorySample::with_normal(Vector3::new(x, 9.0, 0.0), -Vector3::y())
        })
        .collect();
    let measured = (0..samples.len()).map(|i| 2.0 + (i % 3) as f64).collect();
    Segment::new(gesture, index, samples.len() as f64 / 100.0, samples, measured).unwrap()
}

fn write_fixtures(source: &JsonSegmentSource) {
    source
        .write_segments("Circle", &[sweep("Circle", 0, -1.0), sweep("Circle", 1, 0.0)])
        .unwrap();
    source.write_segments("One", &[sweep("One", 0, 0.5)]).unwrap();
}

#[derive(Default)]
struct MemoryWriter {
    records: Mutex<Vec<ExportRecord>>,
}

impl RecordWriter for MemoryWriter {
    fn write(&self, record: &ExportRecord) -> Result<PathBuf, WriteError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(PathBuf::from(format!("memory/{}", record.name)))
    }
}

struct RejectingWriter;

impl RecordWriter for RejectingWriter {
    fn write(&self, record: &ExportRecord) -> Result<PathBuf, WriteError> {
        Err(WriteError::Write {
            path: PathBuf::from(&record.name),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        })
    }
}

fn assert_consistent(record: &ExportRecord) {
    let n = record.num_samples;
    assert!(n > 0);
    for (field, len) in [
        ("positions", record.positions.len()),
        ("normals", record.normals.len()),
        ("real_power", record.real_power.len()),
        ("sim_oriented_raw", record.sim_oriented_raw.len()),
        ("sim_oriented", record.sim_oriented.len()),
        ("sim_parallel_raw", record.sim_parallel_raw.len()),
        ("sim_parallel", record.sim_parallel.len()),
        ("a_values", record.a_values.len()),
        ("H_values", record.h_values.len()),
    ] {
        assert_eq!(len, n, "{field} length");
    }

    let real_min = record.real_power.iter().copied().fold(f64::INFINITY, f64::min);
    let real_max = record.real_power.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for model in [PowerModel::OrientedDisk, PowerModel::Parallel] {
        let (raw, calibrated) = record.series(model);
        assert!(raw.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(calibrated
            .iter()
            .all(|&p| p >= real_min - 1e-12 && p <= real_max + 1e-12));
    }
}

#[test]
fn test_batch_from_files_to_files() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let source = JsonSegmentSource::new(dir.path().join("segments"));
    write_fixtures(&source);
    let writer = JsonRecordWriter::new(dir.path().join("export"));

    let exporter = GestureExporter::new(source, lamp());
    let requests = vec![
        GestureRequest::new("Circle", 1),
        GestureRequest::new("Square", 0),
        GestureRequest::new("One", 99),
    ];
    let summary = exporter.export_batch(&requests, &writer);

    // The missing gesture does not stop the ones after it
    assert!(!summary.is_complete());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].name, "Square");
    assert!(summary.failed[0].error.contains("No segment data"));

    let names: Vec<&str> = summary.exported.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Circle", "One"]);
    assert!(summary.exported[1].diagnostics.substituted_index());

    let circle = ExportRecord::load_from_file(dir.path().join("export/circle.json")).unwrap();
    assert_eq!(circle.segment_index, 1);
    assert_eq!(circle.sampling_rate, 100.0);
    assert_eq!(circle.light_source, lamp().descriptor());
    assert_consistent(&circle);

    let one = ExportRecord::load_from_file(dir.path().join("export/one.json")).unwrap();
    assert_eq!(one.segment_index, 0);
    assert_consistent(&one);
}

#[test]
fn test_substituted_index_matches_first_segment() {
    init_logging();
    let mut source = InMemorySegmentSource::new();
    source.insert(sweep("Two", 0, -0.5));
    let exporter = GestureExporter::new(source, lamp());

    let first = exporter.export(&GestureRequest::new("Two", 0)).unwrap();
    let substituted = exporter.export(&GestureRequest::new("Two", 99)).unwrap();

    assert_eq!(substituted.record, first.record);
}

#[test]
fn test_parallel_batch_matches_sequential() {
    init_logging();
    let mut source = InMemorySegmentSource::new();
    for (i, name) in ["Circle", "One", "Two", "Three", "Triangle"].iter().enumerate() {
        source.insert(sweep(name, 0, -1.0 + 0.3 * i as f64));
    }
    let exporter = GestureExporter::new(source, lamp());
    let mut requests: Vec<GestureRequest> = ExportConfig::default().gestures;
    requests.insert(2, GestureRequest::new("Missing", 0));

    let sequential_writer = MemoryWriter::default();
    let parallel_writer = MemoryWriter::default();
    let sequential = exporter.export_batch(&requests, &sequential_writer);
    let parallel = exporter.export_batch_parallel(&requests, &parallel_writer);

    assert_eq!(sequential, parallel);
    assert_eq!(sequential.exported.len(), 5);
    assert_eq!(sequential.failed[0].name, "Missing");

    let mut a = sequential_writer.records.into_inner().unwrap();
    let mut b = parallel_writer.records.into_inner().unwrap();
    a.sort_by(|x, y| x.name.cmp(&y.name));
    b.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!(a, b);
}

#[test]
fn test_write_failure_is_contained() {
    init_logging();
    let mut source = InMemorySegmentSource::new();
    source.insert(sweep("Circle", 0, 0.0));
    source.insert(sweep("One", 0, 0.0));
    let exporter = GestureExporter::new(source, lamp());

    let requests = [GestureRequest::new("Circle", 0), GestureRequest::new("One", 0)];
    let summary = exporter.export_batch(&requests, &RejectingWriter);

    assert!(summary.exported.is_empty());
    assert_eq!(summary.failed.len(), 2);
    assert!(summary.failed[1].error.ends_with("disk full"));
}

#[test]
fn test_on_axis_end_to_end() {
    init_logging();
    let samples = [9.0, 8.0, 5.0]
        .iter()
        .map(|&y| TrajectorySample::new(Vector3::new(0.0, y, 0.0)))
        .collect();
    let mut source = InMemorySegmentSource::new();
    source.insert(Segment::new("Circle", 0, 0.03, samples, vec![0.1, 0.9, 0.5]).unwrap());

    for method in [IntegrationMethod::Quadrature, IntegrationMethod::ClosedForm] {
        let config = ExportConfig {
            light_source: lamp(),
            integrator: radiometry::ViewFactorIntegrator {
                method,
                ..Default::default()
            },
            ..Default::default()
        };
        let exporter = GestureExporter::from_config(source.clone(), &config);
        let record = exporter
            .export(&GestureRequest::new("Circle", 0))
            .unwrap()
            .record;

        for (raw, expected) in record.sim_parallel_raw.iter().zip([0.5, 0.2, 1.0 / 26.0]) {
            assert_abs_diff_eq!(*raw, expected, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(record.sim_parallel[0], 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(record.sim_parallel[2], 0.1, epsilon = 1e-12);
    }
}

#[test]
fn test_receiver_facing_away_sees_nothing() {
    init_logging();
    // Normal pointing at the lamp means the sensing face points away from it
    let samples = vec![
        TrajectorySample::with_normal(Vector3::new(0.0, 9.0, 0.0), Vector3::y()),
        TrajectorySample::with_normal(Vector3::new(0.0, 8.0, 0.0), Vector3::y()),
    ];
    let mut source = InMemorySegmentSource::new();
    source.insert(Segment::new("Three", 0, 0.02, samples, vec![1.0, 2.0]).unwrap());

    let outcome = GestureExporter::new(source, lamp())
        .export(&GestureRequest::new("Three", 0))
        .unwrap();

    assert_eq!(outcome.record.sim_oriented_raw, vec![0.0, 0.0]);
    assert!(outcome.record.sim_parallel_raw.iter().all(|&p| p > 0.0));
    // Constant oriented series falls back to the measured minimum
    assert_eq!(outcome.record.sim_oriented, vec![1.0, 1.0]);
    assert!(outcome.diagnostics.oriented_degenerate_calibration);
    assert!(!outcome.diagnostics.parallel_degenerate_calibration);
}
