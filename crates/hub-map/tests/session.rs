use std::collections::BTreeMap;

use hub_ingest::parse_document;
use hub_map::{
    ClientError, ClientResult, MappingClient, MappingError, MappingField, MappingSession,
    SaveOutcome, SaveStatus, SessionOptions, evaluate_artifact,
};
use hub_model::{
    Authorities, EntityDefinition, EntityProperty, EvaluationResponse, MappingArtifact,
    MappingFunction, NodeId, PropertyPath, RelatedEntityDefinition, SourceDocument, SourcePath,
    TableId,
};

const PERSON_JSON: &str = r#"{
  "envelope": {
    "instance": {
      "proteinId": "extremelylongusername@marklogic.com",
      "proteinType": ["s@ml.com", "", "t@ml.com", "u@ml.com", "v@ml.com", "w@ml.com", "x@ml.com", "y@ml.com", "z@ml.com"],
      "FirstNamePreferred": "Top",
      "nutFreeName": {
        "FirstNamePreferred": "John",
        "LastName": "Smith"
      },
      "BabyRegistry": {
        "BabyRegistryId": "3039"
      }
    }
  }
}"#;

const PROTEIN_XML: &str = r#"<sampleProtein xmlns:nutFree="http://www.nutfree.com">
  <proteinId>123EAC</proteinId>
  <nutFree:name>
    <FirstNamePreferred>John</FirstNamePreferred>
    <LastName>Smith</LastName>
  </nutFree:name>
  <nutFree:proteinDog>retriever</nutFree:proteinDog>
  <nutFree:proteinDog>golden</nutFree:proteinDog>
  <nutFree:proteinDog>labrador</nutFree:proteinDog>
</sampleProtein>"#;

/// In-memory stand-in for the mapping, modeling and document services.
#[derive(Default)]
struct MemoryHub {
    artifacts: BTreeMap<String, MappingArtifact>,
    definitions: BTreeMap<String, EntityDefinition>,
    documents: Vec<SourceDocument>,
    fail_updates: bool,
    updates: usize,
}

impl MappingClient for MemoryHub {
    fn fetch_mapping_artifact(&self, name: &str) -> ClientResult<MappingArtifact> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(name.to_string()))
    }

    fn update_mapping_artifact(&mut self, artifact: &MappingArtifact) -> ClientResult<()> {
        if self.fail_updates {
            return Err(ClientError::Request("service unavailable".into()));
        }
        self.updates += 1;
        self.artifacts.insert(artifact.name.clone(), artifact.clone());
        Ok(())
    }

    fn fetch_nested_entity_definitions(&self, entity_type: &str) -> ClientResult<EntityDefinition> {
        self.definitions
            .get(entity_type)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(entity_type.to_string()))
    }

    fn fetch_source_document_uris(&self, _query: &str) -> ClientResult<Vec<String>> {
        Ok(self.documents.iter().map(|d| d.uri.clone()).collect())
    }

    fn fetch_source_document(&self, uri: &str) -> ClientResult<SourceDocument> {
        self.documents
            .iter()
            .find(|d| d.uri == uri)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(uri.to_string()))
    }

    fn evaluate_mapping_expression(
        &self,
        artifact: &MappingArtifact,
        uri: &str,
    ) -> ClientResult<EvaluationResponse> {
        let document = self.fetch_source_document(uri)?;
        let tree = parse_document(&document).map_err(|e| ClientError::Request(e.to_string()))?;
        Ok(evaluate_artifact(&tree, artifact))
    }

    fn list_mapping_functions(&self) -> ClientResult<Vec<MappingFunction>> {
        Ok(vec![MappingFunction {
            function_name: "concat".into(),
            signature: "concat(xs:anyAtomicType?)".into(),
            category: Some("builtin".into()),
        }])
    }
}

fn prop(name: &str) -> EntityProperty {
    EntityProperty {
        name: name.into(),
        datatype: "string".into(),
        ..EntityProperty::default()
    }
}

fn person() -> EntityDefinition {
    EntityDefinition {
        entity_type: "Person".into(),
        properties: vec![
            prop("propId"),
            prop("propName"),
            prop("propAttribute"),
            EntityProperty {
                name: "items".into(),
                datatype: "parent-ItemType".into(),
                multiple: true,
                properties: vec![prop("itemTypes"), prop("propName")],
                ..EntityProperty::default()
            },
        ],
        related_entity_types: vec![RelatedEntityDefinition {
            entity_type: "BabyRegistry".into(),
            relationship_name: "ownedBy".into(),
            related_from: "Person".into(),
            properties: vec![prop("babyRegistryId")],
            related_entity_types: vec![RelatedEntityDefinition {
                entity_type: "Product".into(),
                relationship_name: "hasProduct".into(),
                related_from: "BabyRegistry".into(),
                properties: vec![prop("productName")],
                related_entity_types: vec![],
            }],
        }],
    }
}

fn hub() -> MemoryHub {
    let mut hub = MemoryHub::default();
    hub.artifacts.insert(
        "mapPersonJSON".into(),
        MappingArtifact::new("mapPersonJSON", "Person"),
    );
    hub.definitions.insert("Person".into(), person());
    hub.documents = vec![
        SourceDocument {
            uri: "/dummy/uri/person-101.json".into(),
            content: PERSON_JSON.into(),
        },
        SourceDocument {
            uri: "/dummy/uri/protein-102.xml".into(),
            content: PROTEIN_XML.into(),
        },
    ];
    hub
}

fn open(authorities: Authorities) -> MappingSession<MemoryHub> {
    MappingSession::open(hub(), "mapPersonJSON", authorities, SessionOptions::default()).unwrap()
}

fn writer() -> MappingSession<MemoryHub> {
    open(Authorities::from_names(["readMapping", "writeMapping"]))
}

fn node(session: &MappingSession<MemoryHub>, path: &str) -> NodeId {
    session
        .tree()
        .unwrap()
        .find(&SourcePath::parse(path).unwrap())
        .unwrap()
}

fn path(text: &str) -> PropertyPath {
    PropertyPath::parse(text).unwrap()
}

fn registry() -> TableId {
    TableId::Related("BabyRegistry.ownedBy:Person".into())
}

#[test]
fn open_requires_read_authority() {
    let result = MappingSession::open(
        hub(),
        "mapPersonJSON",
        Authorities::default(),
        SessionOptions::default(),
    );
    assert!(matches!(
        result,
        Err(MappingError::PermissionDenied { authority: "readMapping", .. })
    ));
}

#[test]
fn opening_loads_first_document_and_functions() {
    let session = writer();
    assert_eq!(session.current_uri(), Some("/dummy/uri/person-101.json"));
    assert_eq!(session.uri_position(), Some(1));
    assert_eq!(session.functions().len(), 1);
    assert_eq!(session.visible_tables().len(), 1);
}

#[test]
fn same_key_at_same_depth_maps_independently() {
    let mut session = writer();
    let top = node(&session, "FirstNamePreferred");
    let nested = node(&session, "nutFreeName/FirstNamePreferred");
    let name = session
        .select_source(&TableId::Primary, &path("propName"), top)
        .unwrap();
    let attribute = session
        .select_source(&TableId::Primary, &path("propAttribute"), nested)
        .unwrap();
    assert_eq!(name, "FirstNamePreferred");
    assert_eq!(attribute, "nutFreeName/FirstNamePreferred");
    assert_eq!(
        session.state().expression(&TableId::Primary, &path("propName")),
        "FirstNamePreferred"
    );
    let saved = &session.client().artifacts["mapPersonJSON"];
    assert_eq!(
        saved.expression(&TableId::Primary, &path("propAttribute")),
        Some("nutFreeName/FirstNamePreferred")
    );
}

#[test]
fn structured_property_scopes_its_children() {
    let mut session = writer();
    let names = node(&session, "nutFreeName");
    let first = node(&session, "nutFreeName/FirstNamePreferred");
    session
        .select_source(&TableId::Primary, &path("items"), names)
        .unwrap();
    let expression = session
        .select_source(&TableId::Primary, &path("items/itemTypes"), first)
        .unwrap();
    assert_eq!(expression, "FirstNamePreferred");
}

#[test]
fn related_context_set_and_cleared() {
    let mut session = writer();
    let table = registry();
    session.show_related(&table).unwrap();
    session.edit_context(&table, "BabyRegistry").unwrap();
    let id = node(&session, "BabyRegistry/BabyRegistryId");

    let scoped = session
        .select_source(&table, &path("babyRegistryId"), id)
        .unwrap();
    assert_eq!(scoped, "BabyRegistryId");

    session.clear_context(&table).unwrap();
    assert_eq!(session.state().context_expression(&table), "/");
    let full = session
        .select_source(&table, &path("babyRegistryId"), id)
        .unwrap();
    assert_eq!(full, "BabyRegistry/BabyRegistryId");

    // a node outside the old context keeps its full path once cleared
    session.edit_context(&table, "BabyRegistry").unwrap();
    let last = node(&session, "nutFreeName/LastName");
    session.clear_context(&table).unwrap();
    assert_eq!(
        session
            .select_source(&table, &path("babyRegistryId"), last)
            .unwrap(),
        "nutFreeName/LastName"
    );

    let saved = &session.client().artifacts["mapPersonJSON"];
    assert_eq!(saved.expression_context("BabyRegistry.ownedBy:Person"), Some("/"));
    assert_eq!(
        saved.expression(&table, &path("babyRegistryId")),
        Some("nutFreeName/LastName")
    );
}

#[test]
fn same_property_name_at_two_levels_saves_separately() {
    let mut session = writer();
    let top = path("propName");
    let nested = path("items/propName");
    session
        .edit_expression(&TableId::Primary, &top, "FirstNamePreferred")
        .unwrap();

    let saved = &session.client().artifacts["mapPersonJSON"];
    assert_eq!(saved.expression(&TableId::Primary, &top), Some("FirstNamePreferred"));
    assert_eq!(saved.expression(&TableId::Primary, &nested).unwrap_or_default(), "");

    session
        .edit_expression(&TableId::Primary, &nested, "LastName")
        .unwrap();
    let saved = &session.client().artifacts["mapPersonJSON"];
    assert_eq!(saved.expression(&TableId::Primary, &top), Some("FirstNamePreferred"));
    assert_eq!(saved.expression(&TableId::Primary, &nested), Some("LastName"));
}

#[test]
fn selecting_the_context_node_stores_slash() {
    let mut session = writer();
    let table = registry();
    let registry_node = node(&session, "BabyRegistry");
    assert_eq!(
        session.select_context(&table, registry_node).unwrap(),
        "BabyRegistry"
    );
    assert_eq!(
        session
            .select_source(&table, &path("babyRegistryId"), registry_node)
            .unwrap(),
        "/"
    );
}

#[test]
fn xml_paths_keep_namespace_prefixes() {
    let mut session = writer();
    assert!(session.next_document().unwrap());
    assert_eq!(session.uri_position(), Some(2));
    let last = node(&session, "sampleProtein/nutFree:name/LastName");
    let dog = node(&session, "sampleProtein/nutFree:proteinDog");
    assert_eq!(
        session
            .select_source(&TableId::Primary, &path("propName"), last)
            .unwrap(),
        "sampleProtein/nutFree:name/LastName"
    );
    assert_eq!(
        session
            .select_source(&TableId::Primary, &path("propAttribute"), dog)
            .unwrap(),
        "sampleProtein/nutFree:proteinDog"
    );
    assert_eq!(session.source_value(dog).unwrap().text, "retriever (2 more)");
    // merged repeated elements appear once in the selector
    let dogs = session.search_source_options("proteindog");
    assert_eq!(dogs.len(), 1);
    assert!(dogs[0].is_array);
}

#[test]
fn document_navigation_is_bounded() {
    let mut session = writer();
    assert!(!session.previous_document().unwrap());
    assert!(session.next_document().unwrap());
    assert!(!session.next_document().unwrap());
    assert!(session.previous_document().unwrap());
    assert_eq!(session.uri_position(), Some(1));
    assert!(session.set_document_uri("/dummy/uri/missing.json").is_err());
    assert_eq!(session.uri_position(), Some(1));
}

#[test]
fn reader_cannot_edit_but_can_test() {
    let mut session = open(Authorities::from_names(["readMapping"]));
    let id = node(&session, "proteinId");
    let err = session
        .select_source(&TableId::Primary, &path("propId"), id)
        .unwrap_err();
    assert!(matches!(
        err,
        MappingError::PermissionDenied { authority: "writeMapping", .. }
    ));
    assert_eq!(session.state().expression(&TableId::Primary, &path("propId")), "");
    assert!(session.can_test());
    session.test().unwrap();
}

#[test]
fn test_requires_read_authority() {
    let mut session = writer();
    session.update_authorities(Authorities::default());
    assert!(!session.can_test());
    assert!(matches!(
        session.test(),
        Err(MappingError::PermissionDenied { authority: "readMapping", .. })
    ));
    assert!(session.evaluation().is_empty());
}

#[test]
fn failed_save_keeps_local_edit() {
    let mut hub = hub();
    hub.fail_updates = true;
    let mut session = MappingSession::open(
        hub,
        "mapPersonJSON",
        Authorities::all(),
        SessionOptions::default(),
    )
    .unwrap();
    let err = session
        .edit_expression(&TableId::Primary, &path("propId"), "proteinId")
        .unwrap_err();
    assert!(matches!(err, MappingError::Client(_)));
    assert_eq!(
        session.state().expression(&TableId::Primary, &path("propId")),
        "proteinId"
    );
    let field = MappingField::property(TableId::Primary, path("propId"));
    assert!(matches!(session.save_status(&field), Some(SaveStatus::Failed(_))));
    assert_eq!(session.client().updates, 0);
}

#[test]
fn test_waits_for_pending_saves() {
    let mut session = writer();
    session
        .edit_expression(&TableId::Primary, &path("propId"), "proteinId")
        .unwrap();
    let field = MappingField::property(TableId::Primary, path("propId"));
    assert_eq!(session.save_status(&field), Some(&SaveStatus::Saved));

    let first = session.begin_save(field.clone());
    let second = session.begin_save(field.clone());
    assert!(!session.can_test());
    assert!(matches!(session.test(), Err(MappingError::SavesPending)));

    // responses arrive out of order
    assert_eq!(
        session.complete_save(second, Ok(())),
        SaveOutcome::Applied(SaveStatus::Saved)
    );
    assert_eq!(
        session.complete_save(first, Err("timeout".into())),
        SaveOutcome::Superseded
    );
    assert_eq!(session.save_status(&field), Some(&SaveStatus::Saved));
    assert!(session.can_test());
}

#[test]
fn evaluated_values_are_truncated_for_display_only() {
    let mut session = writer();
    session
        .edit_expression(&TableId::Primary, &path("propName"), "proteinId")
        .unwrap();
    session
        .edit_expression(&TableId::Primary, &path("propAttribute"), "proteinType")
        .unwrap();
    session
        .edit_expression(&TableId::Primary, &path("propId"), "concat(")
        .unwrap();
    session.test().unwrap();

    let shown = session
        .entity_value(&TableId::Primary, &path("propName"))
        .unwrap();
    assert_eq!(shown.text, "extremelylongusername@m...");
    assert_eq!(
        shown.tooltip.as_deref(),
        Some("extremelylongusername@marklogic.com")
    );
    assert_eq!(
        session
            .entity_value(&TableId::Primary, &path("propAttribute"))
            .unwrap()
            .text,
        "s@ml.com (7 more)"
    );
    assert_eq!(
        session
            .evaluation()
            .error(&TableId::Primary, &path("propId")),
        Some("Invalid XPath expression: concat(")
    );
    assert_eq!(
        session.state().expression(&TableId::Primary, &path("propId")),
        "concat("
    );

    let id = node(&session, "proteinId");
    assert_eq!(session.source_value(id).unwrap().text, "extremelylongu...");

    session.clear_test();
    assert!(session.evaluation().is_empty());
}

#[test]
fn hiding_a_table_hides_tables_related_through_it() {
    let mut session = writer();
    let product = TableId::Related("Product.hasProduct:BabyRegistry".into());
    session.show_related(&product).unwrap();
    assert!(session.is_table_visible(&registry()));
    assert_eq!(session.visible_tables().len(), 3);

    session.hide_related(&registry()).unwrap();
    assert!(!session.is_table_visible(&product));
    assert_eq!(session.visible_tables().len(), 1);
}

#[test]
fn mapped_related_tables_start_visible() {
    let mut hub = hub();
    let artifact = hub.artifacts.get_mut("mapPersonJSON").unwrap();
    artifact.set_expression_context("BabyRegistry.ownedBy:Person", "BabyRegistry");
    let session = MappingSession::open(
        hub,
        "mapPersonJSON",
        Authorities::all(),
        SessionOptions::default(),
    )
    .unwrap();
    assert!(session.is_table_visible(&registry()));
    assert_eq!(
        session
            .state()
            .table(&registry())
            .unwrap()
            .context()
            .map(ToString::to_string),
        Some("BabyRegistry".to_string())
    );
}
