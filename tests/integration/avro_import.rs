//! End-to-end import scenario: stage an Avro fixture, launch the import
//! template against a provisioned table, poll the run to completion, and
//! assert the read-back contents family by family.

#![cfg(feature = "test-harness")]

use std::sync::Arc;

use gantry::asserts::{family_records, record};
use gantry::avro::RowCodec;
use gantry::fixtures::{
    sample_import_families, sample_import_rows, AvroImportTemplate, PARAM_INPUT_FILE_PATTERN,
    PARAM_INSTANCE_ID, PARAM_PROJECT_ID, PARAM_TABLE_ID, TEMPLATE_AVRO_TO_TABLE,
};
use gantry::storage::{RowCell, RowRecord};
use gantry::{LaunchConfig, Phase, TemplateTestEnvironment};

use crate::integration::test_env;

fn register_import_template(env: &TemplateTestEnvironment) {
    env.register_template(
        TEMPLATE_AVRO_TO_TABLE,
        Arc::new(AvroImportTemplate::new(
            Arc::clone(env.staging()),
            Arc::clone(env.tables()),
        )),
    )
    .unwrap();
}

fn import_launch_config(env: &TemplateTestEnvironment, table_id: &str, input_uri: &str) -> LaunchConfig {
    LaunchConfig::builder(&env.context().run_name, TEMPLATE_AVRO_TO_TABLE)
        .add_parameter(PARAM_PROJECT_ID, &env.context().project_id)
        .add_parameter(PARAM_INSTANCE_ID, &env.config().instance_id)
        .add_parameter(PARAM_TABLE_ID, table_id)
        .add_parameter(PARAM_INPUT_FILE_PATTERN, input_uri)
        .build()
}

#[tokio::test]
async fn test_avro_import_round_trip() {
    let mut env = test_env();
    register_import_template(&env);

    // Arrange
    let codec = RowCodec::new().unwrap();
    let fixture = codec.encode_rows(&sample_import_rows()).unwrap();
    let input_uri = env
        .stage_bytes(&env.context().input_path("import-fixture.avro"), &fixture)
        .await
        .unwrap();

    let table_id = env.provision_table(&sample_import_families()).await.unwrap();

    // Act
    let handle = env
        .launch(import_launch_config(&env, &table_id, &input_uri))
        .await
        .unwrap();
    assert_eq!(env.phase(), Phase::Running);

    let result = env.wait_until_done(&handle).await.unwrap();

    // Assert
    assert!(result.is_succeeded(), "import run ended in {:?}", result.state);
    let rows = env.read_table(&table_id).await.unwrap();

    family_records(&rows, "family1")
        .assert_exactly(&[record(&[("column1", "value1")])])
        .unwrap();
    family_records(&rows, "family2")
        .assert_exactly(&[
            record(&[("column2", "value2")]),
            record(&[("column2", "value3")]),
        ])
        .unwrap();
    family_records(&rows, "family2")
        .assert_contains(&[record(&[("column2", "value3")])])
        .unwrap();

    env.teardown().await.unwrap();
    assert_eq!(env.phase(), Phase::TornDown);
}

#[tokio::test]
async fn test_import_preserves_rows_byte_for_byte() {
    let mut env = test_env();
    register_import_template(&env);

    let fixture_rows = vec![RowRecord::new(vec![0x00u8, 0x01, 0xff]).with_cell(
        "family1",
        RowCell::new(vec![0x10u8, 0x20], vec![0xde, 0xad, 0xbe, 0xef]).with_timestamp(42),
    )];
    let codec = RowCodec::new().unwrap();
    let fixture = codec.encode_rows(&fixture_rows).unwrap();

    let input_uri = env
        .stage_bytes(&env.context().input_path("binary-fixture.avro"), &fixture)
        .await
        .unwrap();
    let table_id = env.provision_table(&["family1"]).await.unwrap();

    let handle = env
        .launch(import_launch_config(&env, &table_id, &input_uri))
        .await
        .unwrap();
    let result = env.wait_until_done(&handle).await.unwrap();
    assert!(result.is_succeeded());

    // The read-back rows are exactly the encoded ones, including binary
    // keys, qualifiers, values, and timestamps.
    let rows = env.read_table(&table_id).await.unwrap();
    assert_eq!(rows, fixture_rows);

    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_mismatch_reports_are_descriptive() {
    let mut env = test_env();
    register_import_template(&env);

    let codec = RowCodec::new().unwrap();
    let fixture = codec.encode_rows(&sample_import_rows()).unwrap();
    let input_uri = env
        .stage_bytes(&env.context().input_path("import-fixture.avro"), &fixture)
        .await
        .unwrap();
    let table_id = env.provision_table(&sample_import_families()).await.unwrap();

    let handle = env
        .launch(import_launch_config(&env, &table_id, &input_uri))
        .await
        .unwrap();
    env.wait_until_done(&handle).await.unwrap();

    let rows = env.read_table(&table_id).await.unwrap();
    let err = family_records(&rows, "family1")
        .assert_exactly(&[record(&[("column1", "wrong-value")])])
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("family1"), "got: {message}");
    assert!(
        message.contains("expected {column1=wrong-value} but found {column1=value1}"),
        "got: {message}"
    );

    env.teardown().await.unwrap();
}
