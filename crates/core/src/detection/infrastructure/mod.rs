pub mod recorded_detector;
