//! Integration tests for loading, instantiation and configuration.

mod common;

use common::*;
use std::io::Write;
use vessel_bridge::{Bindings, Bridge, BridgeConfig, BridgeError, BridgeRuntime, BridgeStatus};

#[test]
fn test_compile_and_list_exports() {
    let runtime = BridgeRuntime::with_defaults().expect("failed to create runtime");
    let module = runtime
        .load_module_bytes("echo", &wasm(ECHO_VESSEL))
        .expect("failed to compile");

    assert_eq!(module.name(), "echo");
    let exports: Vec<&str> = module.exports().collect();
    assert!(exports.contains(&"initialize"));
    assert!(exports.contains(&"_EXPORT_make_buffer"));
    assert!(exports.contains(&"_EXPORT_input"));
    assert!(!exports.contains(&"memory"), "memory is not a function export");

    let imports = module.imports();
    assert!(imports.contains(&"env::_EXPORT_output".to_string()));
    assert!(imports.contains(&"env::_EXPORT_enqueue".to_string()));
}

#[test]
fn test_invalid_module_fails_to_compile() {
    let runtime = BridgeRuntime::with_defaults().unwrap();
    let result = runtime.load_module_bytes("invalid", b"not a wasm module");
    assert!(matches!(result, Err(BridgeError::Compile(_))));
}

#[test]
fn test_missing_export_is_reported() {
    let runtime = BridgeRuntime::with_defaults().unwrap();
    let module = runtime
        .load_module_bytes("incomplete", &wasm(INCOMPLETE_VESSEL))
        .unwrap();

    match runtime.instantiate(&module) {
        Err(BridgeError::MissingExport { name, .. }) => assert_eq!(name, "_EXPORT_input"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("instantiation should fail"),
    }
}

#[test]
fn test_custom_bindings() {
    let wat = r#"
        (module
          (import "host" "emit" (func $emit (param i32 i32)))
          (memory (export "mem") 1)
          (data (i32.const 0) "hi")
          (func (export "setup") (call $emit (i32.const 0) (i32.const 2)))
          (func (export "alloc") (param i32) (result i32) (i32.const 512))
          (func (export "feed") (param $ptr i32)
            (call $emit (local.get $ptr) (i32.const 1))))
    "#;
    let bindings = Bindings {
        memory: "mem".to_string(),
        initialize: "setup".to_string(),
        allocate: "alloc".to_string(),
        consume_input: "feed".to_string(),
        process: "tick".to_string(),
        import_module: "host".to_string(),
        output: "emit".to_string(),
        request_schedule: "wake".to_string(),
        panic: "abort".to_string(),
    };
    let mut bridge = ready_with(BridgeConfig::default().bindings(bindings), wat);
    let received = collect(&mut bridge);

    bridge.send(&[42]).unwrap();
    assert_eq!(seen(&received), vec![b"hi".to_vec(), vec![42]]);
}

#[test]
fn test_initialize_trap_fails_bridge() {
    let wat = r#"
        (module
          (memory (export "memory") 1)
          (func (export "initialize") unreachable)
          (func (export "_EXPORT_make_buffer") (param i32) (result i32) (i32.const 0))
          (func (export "_EXPORT_input") (param i32)))
    "#;
    let mut bridge = instantiate_with(BridgeConfig::default(), wat);

    let err = bridge.initialize().unwrap_err();
    assert!(matches!(err, BridgeError::ModuleTrap { ref call, .. } if call == "initialize"));
    assert!(matches!(bridge.status(), BridgeStatus::Failed(_)));
    assert!(matches!(bridge.send(&[1]), Err(BridgeError::Failed { .. })));
}

#[test]
fn test_load_module_from_file() {
    let mut file = tempfile::Builder::new()
        .prefix("echo_vessel")
        .suffix(".wasm")
        .tempfile()
        .unwrap();
    file.write_all(&wasm(ECHO_VESSEL)).unwrap();

    let config = BridgeConfig::default().max_deferred_per_turn(3);
    let runtime = BridgeRuntime::new(config).unwrap();
    assert_eq!(runtime.config().max_deferred_per_turn, 3);

    let module = runtime.load_module(file.path()).expect("load_module failed");
    assert!(module.name().starts_with("echo_vessel"));
    assert!(!module.name().ends_with(".wasm"));

    let mut bridge = runtime.instantiate(&module).unwrap();
    bridge.initialize().unwrap();
    let received = collect(&mut bridge);
    bridge.send(&[4, 5]).unwrap();
    assert_eq!(seen(&received), vec![b"ready".to_vec(), vec![4, 5]]);
}

#[test]
fn test_load_module_missing_file_is_io_error() {
    let runtime = BridgeRuntime::with_defaults().unwrap();
    assert!(matches!(
        runtime.load_module("/nonexistent/vessel.wasm"),
        Err(BridgeError::Io(_))
    ));
}

#[tokio::test]
async fn test_load_resolves_ready_bridge() {
    let mut file = tempfile::Builder::new()
        .suffix(".wasm")
        .tempfile()
        .unwrap();
    file.write_all(&wasm(ECHO_VESSEL)).unwrap();

    let runtime = BridgeRuntime::with_defaults().unwrap();
    let mut bridge = Bridge::load(&runtime, file.path()).await.expect("load failed");
    assert!(bridge.is_ready());

    let received = collect(&mut bridge);
    bridge.send(&[1, 2, 3]).unwrap();
    assert_eq!(seen(&received), vec![b"ready".to_vec(), vec![1, 2, 3]]);
}

#[tokio::test]
async fn test_load_missing_file_is_io_error() {
    let runtime = BridgeRuntime::with_defaults().unwrap();
    let result = Bridge::load(&runtime, "/nonexistent/vessel.wasm").await;
    assert!(matches!(result, Err(BridgeError::Io(_))));
}

#[test]
fn test_config_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "runtime": {{ "max_memory": 1048576 }}, "max_deferred_per_turn": 4 }}"#
    )
    .unwrap();

    let config = BridgeConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.runtime.max_memory, 1_048_576);
    assert_eq!(config.max_deferred_per_turn, 4);
    assert_eq!(config.bindings, Bindings::default());
}

#[test]
fn test_config_from_bad_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    assert!(matches!(
        BridgeConfig::from_json_file(file.path()),
        Err(BridgeError::Json(_))
    ));
}
