//! End-to-end remap scenarios.
//!
//! These tests drive the full pipeline through the in-memory collaborators:
//! - gridding of HRU series without and with temporal aggregation
//! - failure modes and the stage they are reported under

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use ndarray::{array, Array2};
use smaphb::config::RemapConfig;
use smaphb::io::{MemoryRasters, MemorySeriesStore, MemorySink, RasterSource};
use smaphb::pipeline::{run, RemapPipeline};
use smaphb_core::bbox::BoundingBox;
use smaphb_core::errors::{CollaboratorError, RemapError, Stage};
use smaphb_core::raster::{CategoricalRaster, RasterLayer, NODATA_ID};
use smaphb_core::timeseries::{CatchmentSeries, Timestamp};
use std::cell::Cell;

fn six_hourly(n: usize) -> Vec<Timestamp> {
    let start = NaiveDate::from_ymd_opt(2016, 7, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| start + Duration::hours(6 * i as i64))
        .collect()
}

/// 2 × 4 grid: catchment 11 (HRUs 0 and 1, two cells each) in the west,
/// catchment 12 (HRU 0) in the north-east, one unmapped cell in the south-east.
fn rasters() -> MemoryRasters {
    let lons = array![-75.0, -74.9, -74.8, -74.7];
    let lats = array![40.1, 40.0];
    let catchments = CategoricalRaster::new(
        array![[11, 11, 12, 12], [11, 11, 12, NODATA_ID]],
        lons.clone(),
        lats.clone(),
    )
    .unwrap();
    let hrus = CategoricalRaster::new(
        array![[0, 1, 0, 0], [1, 0, 0, NODATA_ID]],
        lons,
        lats,
    )
    .unwrap();
    MemoryRasters::new(catchments, hrus)
}

fn store(n: usize) -> MemorySeriesStore {
    let times = six_hourly(n);
    let hru0 = |t: usize| 0.20 + 0.01 * t as f64;
    let hru1 = |t: usize| 0.35 - 0.01 * t as f64;
    let mut store = MemorySeriesStore::new();
    store.insert(
        CatchmentSeries::new(
            11,
            times.clone(),
            vec![0, 1],
            Array2::from_shape_fn((n, 2), |(t, k)| if k == 0 { hru0(t) } else { hru1(t) }),
        )
        .unwrap(),
    );
    store.insert(
        CatchmentSeries::new(
            12,
            times,
            vec![0],
            Array2::from_shape_fn((n, 1), |(t, _)| 0.5 + 0.001 * t as f64),
        )
        .unwrap(),
    );
    store
}

fn config(bbox: BoundingBox, time_step: &str) -> RemapConfig {
    RemapConfig::new(bbox, "2016-07-01", "2016-07-31", time_step)
}

fn west_bbox() -> BoundingBox {
    BoundingBox::new(-75.05, -74.85, 39.95, 40.15).unwrap()
}

fn full_bbox() -> BoundingBox {
    BoundingBox::new(-75.05, -74.65, 39.95, 40.15).unwrap()
}

/// Counts raster reads to prove validation happens before any I/O.
struct CountingRasters {
    inner: MemoryRasters,
    reads: Cell<usize>,
}

impl RasterSource for CountingRasters {
    fn read_categorical_raster(
        &self,
        layer: RasterLayer,
        bbox: &BoundingBox,
    ) -> Result<CategoricalRaster, CollaboratorError> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_categorical_raster(layer, bbox)
    }
}

mod gridding {
    use super::*;

    #[test]
    fn single_catchment_native_cadence() {
        let mut store = store(4);
        let mut sink = MemorySink::new();
        let summary = run(
            &config(west_bbox(), "6h"),
            &rasters(),
            &mut store,
            &mut sink,
        )
        .unwrap();

        assert_eq!(summary.catchments, 1);
        assert_eq!((summary.time_steps, summary.lat, summary.lon), (4, 2, 2));
        assert_eq!(summary.missing_cells, 0);

        let dataset = sink.dataset().unwrap();
        assert_eq!(dataset.units, "m3/m3");
        let grid = &dataset.grid;
        assert_eq!(grid.lons, array![-75.0, -74.9]);
        assert_eq!(grid.lats, array![40.1, 40.0]);

        let hru0 = |t: usize| 0.20 + 0.01 * t as f64;
        let hru1 = |t: usize| 0.35 - 0.01 * t as f64;
        for t in 0..4 {
            assert_eq!(grid.values[[t, 0, 0]].to_bits(), hru0(t).to_bits());
            assert_eq!(grid.values[[t, 1, 1]].to_bits(), hru0(t).to_bits());
            assert_eq!(grid.values[[t, 0, 1]].to_bits(), hru1(t).to_bits());
            assert_eq!(grid.values[[t, 1, 0]].to_bits(), hru1(t).to_bits());
        }
    }

    #[test]
    fn unmapped_cells_are_missing_and_covered_cells_are_not() {
        let mut store = store(4);
        let mut sink = MemorySink::new();
        let summary = run(
            &config(full_bbox(), "6h"),
            &rasters(),
            &mut store,
            &mut sink,
        )
        .unwrap();
        assert_eq!(summary.catchments, 2);
        assert_eq!(summary.missing_cells, 1);

        let dataset = sink.dataset().unwrap();
        let grid = &dataset.grid;
        for t in 0..4 {
            assert!(dataset.is_missing(grid.values[[t, 1, 3]]));
            assert_relative_eq!(grid.values[[t, 0, 2]], 0.5 + 0.001 * t as f64);
            assert_relative_eq!(grid.values[[t, 0, 3]], 0.5 + 0.001 * t as f64);
            assert_relative_eq!(grid.values[[t, 1, 2]], 0.5 + 0.001 * t as f64);
        }
        assert_eq!(
            grid.values.iter().filter(|v| dataset.is_missing(**v)).count(),
            4
        );
    }

    #[test]
    fn daily_means_over_eight_days() {
        let mut store = store(32);
        let mut sink = MemorySink::new();
        let summary = run(
            &config(full_bbox(), "daily"),
            &rasters(),
            &mut store,
            &mut sink,
        )
        .unwrap();
        assert_eq!(summary.time_steps, 8);

        let grid = &sink.dataset().unwrap().grid;
        for day in 0..8 {
            let steps = (4 * day)..(4 * day + 4);
            let mean = |f: fn(usize) -> f64| steps.clone().map(f).sum::<f64>() / 4.0;
            let expected_hru0 = mean(|t| 0.20 + 0.01 * t as f64);
            let expected_hru1 = mean(|t| 0.35 - 0.01 * t as f64);
            let expected_c12 = mean(|t| 0.5 + 0.001 * t as f64);

            assert_eq!(
                grid.times[day],
                NaiveDate::from_ymd_opt(2016, 7, 1 + day as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            );
            assert_relative_eq!(grid.values[[day, 0, 0]], expected_hru0, epsilon = 1e-12);
            assert_relative_eq!(grid.values[[day, 0, 1]], expected_hru1, epsilon = 1e-12);
            assert_relative_eq!(grid.values[[day, 1, 2]], expected_c12, epsilon = 1e-12);
            assert!(grid.values[[day, 1, 3]].is_nan());
        }
    }

    #[test]
    fn monthly_and_annual_labels() {
        for (time_step, label) in [("monthly", (2016, 7, 1)), ("annual", (2016, 1, 1))] {
            let mut store = store(32);
            let mut sink = MemorySink::new();
            run(
                &config(full_bbox(), time_step),
                &rasters(),
                &mut store,
                &mut sink,
            )
            .unwrap();
            let grid = &sink.dataset().unwrap().grid;
            let (y, m, d) = label;
            assert_eq!(
                grid.times,
                vec![NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()]
            );
            let expected: f64 = (0..32).map(|t| 0.20 + 0.01 * t as f64).sum::<f64>() / 32.0;
            assert_relative_eq!(grid.values[[0, 0, 0]], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn date_range_limits_time_axis() {
        let mut store = store(32);
        let mut sink = MemorySink::new();
        let config = RemapConfig::new(full_bbox(), "2016-07-02", "2016-07-03", "6h");
        let summary = run(&config, &rasters(), &mut store, &mut sink).unwrap();
        assert_eq!(summary.time_steps, 8);
        assert_relative_eq!(
            sink.dataset().unwrap().grid.values[[0, 0, 0]],
            0.20 + 0.01 * 4.0
        );
    }

    #[test]
    fn write_options_follow_config() {
        let mut config = config(west_bbox(), "6h");
        config.compression_level = 9;
        config.metadata.title = "Custom".to_string();
        let mut sink = MemorySink::new();
        run(&config, &rasters(), &mut store(4), &mut sink).unwrap();

        let options = sink.options().unwrap();
        assert_eq!(options.compression.level(), 9);
        assert!(options.zlib);
        assert_eq!(options.fill_value, -9999);
        assert_eq!(sink.dataset().unwrap().metadata.title, "Custom");
        assert_eq!(sink.dataset().unwrap().name, "SMAPHB_SM");
    }
}

mod failures {
    use super::*;

    #[test]
    fn bbox_without_catchments_is_no_data() {
        let lons = array![0.0, 1.0];
        let lats = array![1.0, 0.0];
        let empty = CategoricalRaster::new(
            Array2::from_elem((2, 2), NODATA_ID),
            lons,
            lats,
        )
        .unwrap();
        let rasters = MemoryRasters::new(empty.clone(), empty);
        let bbox = BoundingBox::new(-0.5, 1.5, -0.5, 1.5).unwrap();
        let mut store = store(4);
        let mut sink = MemorySink::new();

        let err = run(&config(bbox, "6h"), &rasters, &mut store, &mut sink).unwrap_err();
        assert!(matches!(err, RemapError::NoData { .. }));
        assert_eq!(err.stage(), Stage::IndexBuilding);
        assert!(sink.dataset().is_none());
        assert!(store.reads().is_empty());
    }

    #[test]
    fn unsupported_cadence_before_any_read() {
        let rasters = CountingRasters {
            inner: rasters(),
            reads: Cell::new(0),
        };
        let mut store = store(4);
        let mut sink = MemorySink::new();

        let err = run(&config(full_bbox(), "weekly"), &rasters, &mut store, &mut sink)
            .unwrap_err();
        assert!(matches!(err, RemapError::Configuration(_)));
        assert_eq!(rasters.reads.get(), 0);
        assert!(store.reads().is_empty());
        assert!(sink.dataset().is_none());
    }

    #[test]
    fn bbox_outside_raster_is_configuration_error() {
        let bbox = BoundingBox::new(10.0, 11.0, 39.95, 40.15).unwrap();
        let err = run(
            &config(bbox, "6h"),
            &rasters(),
            &mut store(4),
            &mut MemorySink::new(),
        )
        .unwrap_err();
        assert!(matches!(err, RemapError::Configuration(_)));
    }

    #[test]
    fn mismatched_time_axis_aborts() {
        let mut store = store(8);
        store.insert(
            CatchmentSeries::new(12, six_hourly(6), vec![0], Array2::zeros((6, 1))).unwrap(),
        );
        let mut sink = MemorySink::new();
        let err = run(
            &config(full_bbox(), "daily"),
            &rasters(),
            &mut store,
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RemapError::ShapeMismatch {
                catchment: 12,
                expected: 8,
                found: 6
            }
        ));
        assert_eq!(err.stage(), Stage::Remap);
        assert!(sink.dataset().is_none());
    }

    #[test]
    fn missing_series_is_reported_as_remap_failure() {
        let mut store = MemorySeriesStore::new();
        store.insert(
            CatchmentSeries::new(11, six_hourly(4), vec![0, 1], Array2::zeros((4, 2))).unwrap(),
        );
        let err = RemapPipeline::from_config(&config(full_bbox(), "6h"))
            .unwrap()
            .run(&rasters(), &mut store, &mut MemorySink::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RemapError::Collaborator {
                stage: Stage::Remap,
                ..
            }
        ));
        assert!(err.to_string().starts_with("remap failed"));
    }
}
