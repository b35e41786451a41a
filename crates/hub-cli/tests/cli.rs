//! Integration tests for the hub mapper commands.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use hub_cli::cli::{
    ColumnArg, ContextArgs, EvaluateArgs, MapArgs, OptionsArgs, ResolveArgs, SortArg, StepArgs,
    TreeArgs,
};
use hub_cli::commands::{run_context, run_evaluate, run_map, run_options, run_resolve, run_tree};
use hub_model::{MappingArtifact, PropertyPath, TableId};

const PERSON_JSON: &str = r#"{
  "proteinId": "123EAC",
  "nutFreeName": [
    {"FirstNamePreferred": "John", "LastName": "Smith"},
    {"FirstNamePreferred": "Jane"}
  ],
  "proteinType": ["a", "b"],
  "BabyRegistry": {"BabyRegistryId": "3039"}
}"#;

const PROTEIN_XML: &str = r#"<?xml version="1.0"?>
<sampleProtein xmlns:nutFree="http://www.nutfree.com">
  <proteinId>123EAC</proteinId>
  <nutFree:name>
    <FirstNamePreferred>John</FirstNamePreferred>
    <LastName>Smith</LastName>
  </nutFree:name>
  <nutFree:proteinDog>retriever</nutFree:proteinDog>
  <nutFree:proteinDog>golden</nutFree:proteinDog>
</sampleProtein>"#;

const PERSON_ENTITY: &str = r#"{
  "entityType": "Person",
  "properties": [
    {"name": "propId", "datatype": "string"},
    {"name": "propName", "datatype": "string"},
    {"name": "items", "datatype": "parent-ItemType", "multiple": true,
     "properties": [{"name": "itemTypes", "datatype": "string"}]}
  ],
  "relatedEntityTypes": [
    {"entityType": "BabyRegistry", "relationshipName": "ownedBy", "relatedFrom": "Person",
     "properties": [{"name": "babyRegistryId", "datatype": "integer"}]}
  ]
}"#;

const MAPPING: &str = r#"{
  "name": "mapPersonJSON",
  "targetEntityType": "Person",
  "sourceQuery": "cts.collectionQuery(['loadPersonJSON'])",
  "properties": {}
}"#;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn hub() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(&root.join("mappings/mapPersonJSON.mapping.json"), MAPPING);
    write(&root.join("entities/Person.entity.json"), PERSON_ENTITY);
    write(&root.join("sources/person-101.json"), PERSON_JSON);
    write(&root.join("sources/protein-102.xml"), PROTEIN_XML);
    dir
}

fn step(dir: &TempDir) -> StepArgs {
    StepArgs {
        hub: dir.path().to_path_buf(),
        mapping: "mapPersonJSON".into(),
        uri: None,
        read_only: false,
    }
}

fn saved(dir: &TempDir) -> MappingArtifact {
    let text = fs::read_to_string(dir.path().join("mappings/mapPersonJSON.mapping.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn source(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join("sources").join(name)
}

#[test]
fn tree_outline_merges_arrays() {
    let dir = hub();
    let outline = run_tree(&TreeArgs {
        file: source(&dir, "person-101.json"),
        filter: None,
        sort: SortArg::Document,
        value_limit: None,
    })
    .unwrap();
    insta::assert_snapshot!(outline, @r"
    proteinId = 123EAC
    nutFreeName [array]
      FirstNamePreferred [array] = John (1 more)
      LastName = Smith
    proteinType [array] = a (1 more)
    BabyRegistry
      BabyRegistryId = 3039
    ");
}

#[test]
fn tree_filter_keeps_ancestors() {
    let dir = hub();
    let outline = run_tree(&TreeArgs {
        file: source(&dir, "protein-102.xml"),
        filter: Some("last".into()),
        sort: SortArg::Document,
        value_limit: None,
    })
    .unwrap();
    insta::assert_snapshot!(outline, @r"
    sampleProtein
      nutFree:name
        LastName = Smith
    ");
}

#[test]
fn options_list_each_merged_node_once() {
    let dir = hub();
    let table = run_options(&OptionsArgs {
        file: source(&dir, "protein-102.xml"),
        search: Some("proteinDog".into()),
    })
    .unwrap();
    assert_eq!(table.matches("sampleProtein/nutFree:proteinDog").count(), 1);
    assert!(!table.contains("LastName"));
}

#[test]
fn resolve_relative_to_context() {
    let dir = hub();
    let resolve = |target: &str, context: Option<&str>| {
        run_resolve(&ResolveArgs {
            file: source(&dir, "protein-102.xml"),
            target: target.into(),
            context: context.map(str::to_string),
        })
        .unwrap()
    };
    assert_eq!(
        resolve("sampleProtein/nutFree:name/LastName", None),
        "sampleProtein/nutFree:name/LastName"
    );
    assert_eq!(
        resolve("sampleProtein/nutFree:name/LastName", Some("sampleProtein/nutFree:name")),
        "LastName"
    );
    assert_eq!(
        resolve("sampleProtein/nutFree:name", Some("sampleProtein/nutFree:name")),
        "/"
    );
    assert_eq!(
        resolve("sampleProtein/nutFree:proteinDog", Some("sampleProtein/nutFree:name")),
        "nutFree:proteinDog"
    );
}

#[test]
fn resolve_unknown_node_fails() {
    let dir = hub();
    let error = run_resolve(&ResolveArgs {
        file: source(&dir, "protein-102.xml"),
        target: "sampleProtein/missing".into(),
        context: None,
    })
    .unwrap_err();
    assert!(error.to_string().contains("no source node"));
}

#[test]
fn map_saves_to_the_hub() {
    let dir = hub();
    let expression = run_map(&MapArgs {
        step: step(&dir),
        table: None,
        property: "propName".into(),
        source: Some("nutFreeName/FirstNamePreferred".into()),
        expression: None,
    })
    .unwrap();
    assert_eq!(expression, "nutFreeName/FirstNamePreferred");
    assert_eq!(
        saved(&dir).expression(&TableId::Primary, &PropertyPath::parse("propName").unwrap()),
        Some("nutFreeName/FirstNamePreferred")
    );
}

#[test]
fn structured_property_scopes_later_runs() {
    let dir = hub();
    run_map(&MapArgs {
        step: step(&dir),
        table: None,
        property: "items".into(),
        source: Some("nutFreeName".into()),
        expression: None,
    })
    .unwrap();
    let expression = run_map(&MapArgs {
        step: step(&dir),
        table: None,
        property: "items/itemTypes".into(),
        source: Some("nutFreeName/FirstNamePreferred".into()),
        expression: None,
    })
    .unwrap();
    assert_eq!(expression, "FirstNamePreferred");
}

#[test]
fn read_only_step_rejects_edits() {
    let dir = hub();
    let mut args = step(&dir);
    args.read_only = true;
    let error = run_map(&MapArgs {
        step: args,
        table: None,
        property: "propId".into(),
        source: None,
        expression: Some("proteinId".into()),
    })
    .unwrap_err();
    assert!(format!("{error:#}").contains("writeMapping"));
    assert_eq!(saved(&dir).properties.len(), 0);
}

#[test]
fn context_round_trip_for_related_table() {
    let dir = hub();
    let table = "BabyRegistry.ownedBy:Person".to_string();
    let context = run_context(&ContextArgs {
        step: step(&dir),
        table: table.clone(),
        source: Some("BabyRegistry".into()),
        expression: None,
        clear: false,
    })
    .unwrap();
    assert_eq!(context, "BabyRegistry");

    let expression = run_map(&MapArgs {
        step: step(&dir),
        table: Some(table.clone()),
        property: "babyRegistryId".into(),
        source: Some("BabyRegistry/BabyRegistryId".into()),
        expression: None,
    })
    .unwrap();
    assert_eq!(expression, "BabyRegistryId");

    let cleared = run_context(&ContextArgs {
        step: step(&dir),
        table: table.clone(),
        source: None,
        expression: None,
        clear: true,
    })
    .unwrap();
    assert_eq!(cleared, "/");
    assert_eq!(saved(&dir).expression_context(&table), Some("/"));
}

#[test]
fn evaluate_reports_values_and_errors() {
    let dir = hub();
    for (property, expression) in [("propId", "proteinId"), ("propName", "concat(")] {
        run_map(&MapArgs {
            step: step(&dir),
            table: None,
            property: property.into(),
            source: None,
            expression: Some(expression.into()),
        })
        .unwrap();
    }
    let output = run_evaluate(&EvaluateArgs {
        step: step(&dir),
        all_tables: false,
        hide_columns: vec![ColumnArg::Type],
    })
    .unwrap();
    assert!(output.starts_with("Document 1 of 2: person-101.json"));
    assert!(output.contains("123EAC"));
    assert!(output.contains("Invalid XPath expression: concat("));
    assert!(!output.contains("parent-ItemType"));
    assert!(!output.contains("BabyRegistry"));
}

#[test]
fn evaluate_on_another_document() {
    let dir = hub();
    let mut args = step(&dir);
    args.uri = Some("protein-102.xml".into());
    run_map(&MapArgs {
        step: StepArgs {
            uri: Some("protein-102.xml".into()),
            ..step(&dir)
        },
        table: None,
        property: "propId".into(),
        source: Some("sampleProtein/nutFree:proteinDog".into()),
        expression: None,
    })
    .unwrap();
    let output = run_evaluate(&EvaluateArgs {
        step: args,
        all_tables: true,
        hide_columns: vec![],
    })
    .unwrap();
    assert!(output.starts_with("Document 2 of 2: protein-102.xml"));
    assert!(output.contains("retriever (1 more)"));
    assert!(output.contains("Context"));
}
