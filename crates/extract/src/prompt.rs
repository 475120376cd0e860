//! Prompt builders for every gateway request the pipeline issues. All
//! structured payloads are requested inside a ```json fence so the
//! response parsers can locate them deterministically.

use crate::state::PageAnswer;
use primitives::{Entity, Relation, Schema};

/// Per-page structural proposal, sent together with the page image.
pub fn page_schema_prompt(ordinal: u32, filter: Option<&str>) -> String {
    let base = r#"Extract the schema of the meaningful entities in this document page, I want something like:
```json
{
  "title": "Payslip",
  "type": "object",
  "properties": {
    "payslip": {
      "type": "object",
      "properties": {
        "employee": {
          "type": "object",
          "properties": {
            "name": {"type": "string"},
            "position": {"type": "string"}
          },
          "required": ["name", "position"]
        },
        "worked_hours": {"type": "integer"},
        "deductions": {
          "type": "array",
          "items": {
            "type": "object",
            "properties": {
              "description": {"type": "string"},
              "withholdings": {"type": "number"}
            },
            "required": ["description", "withholdings"]
          }
        },
        "net_income": {"type": "number"}
      },
      "required": ["employee", "worked_hours", "net_income"]
    }
  },
  "required": ["payslip"]
}
```
Provide only the json schema, wrapped in backticks (`) like ```json ... ``` and nothing else."#;

    match filter {
        Some(filter) => format!(
            "{base} extract only what is required from the following prompt: {filter} (Page {ordinal})"
        ),
        None => format!("{base} (Page {ordinal})"),
    }
}

/// Fold all per-page proposals into one consistent schema.
pub fn schema_merge_prompt(answers: &[PageAnswer]) -> String {
    let pages = answers
        .iter()
        .map(|answer| format!("Page {}: {}", answer.ordinal, answer.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Generate a unique json schema starting from the following\n\n{pages}\n\n\
         Remember to provide only the json schema without any comments, \
         wrapped in backticks (`) like ```json ... ``` and nothing else."
    )
}

/// Ask for the entity array that a given schema describes. The entities
/// carry type descriptors as attribute values, mirroring the schema
/// structure rather than any document instance.
pub fn entity_array_prompt(schema: &Schema) -> Result<String, serde_json::Error> {
    let schema_json = serde_json::to_string_pretty(schema)?;
    Ok(format!(
        r#"You have to list the entities described by the following json schema:

{schema_json}

Each entity is a JSON object with exactly these fields:
  "id": the entity name,
  "type": the entity type,
  "attributes": an object mapping each attribute name to its type descriptor.

Take as reference the following example:
```json
[
  {{"id": "investorInformation", "type": "object", "attributes": {{
    "targetInvestors": "string", "investmentConsiderations": "string"
  }}}},
  {{"id": "costInformation", "type": "object", "attributes": {{
    "salesCharges": "string",
    "fundExpenses": {{"type": "object", "properties": {{"managementExpenseRatio": "number", "tradingExpenseRatio": "number"}}}}
  }}}}
]
```

Every id must be unique and non-empty. Provide only the JSON array,
wrapped in backticks (`) like ```json ... ``` and nothing else."#
    ))
}

/// Re-entry prompt for the repair loop: the previous payload plus the
/// captured validation error, asking specifically for a fix.
pub fn repair_prompt(previous_payload: &str, error: &str) -> String {
    format!(
        r#"The following JSON entity array is invalid.

Error: {error}

Payload to fix:
{previous_payload}

Please provide only the corrected JSON array of entities, each with 'id',
'type' and 'attributes' fields, wrapped in backticks (`) like ```json ... ```
and nothing else."#
    )
}

/// Merge a newly produced entity set into the existing one.
pub fn reconcile_prompt(existing: &[Entity], incoming: &[Entity]) -> Result<String, serde_json::Error> {
    let existing_json = serde_json::to_string_pretty(existing)?;
    let incoming_json = serde_json::to_string_pretty(incoming)?;
    Ok(format!(
        r#"You are tasked with updating a list of entities. You need to integrate new entities with existing ones,
avoiding duplicates and reconciling any conflicts. Here are the rules:

1. If a new entity has the same ID as an existing entity, update the existing entity with any new or changed attributes.
2. Add any completely new entities that don't match with existing ones.
3. Try to maintain the base structure you have for the existing entities, adding new entities or updating existing entities.

Existing entities:
{existing_json}

New entities to integrate:
{incoming_json}

Please provide the updated list of entities as a JSON array. Each entity should be a JSON object with 'id', 'type', and 'attributes' fields.
Provide only the JSON array, wrapped in backticks (`) like ```json ... ``` and nothing else."#
    ))
}

/// Find directed, named relations among the current entities.
pub fn relations_prompt(entities: &[Entity], filter: Option<&str>) -> Result<String, serde_json::Error> {
    let entities_json = serde_json::to_string_pretty(entities)?;
    let mut prompt = format!(
        r#"Given these entities in this format:
{entities_json}

Find meaningful relations among these entities. Each relation is a JSON object with these fields:
  "source": the id of an existing entity,
  "target": the id of an existing entity,
  "name": the relation name (a verb such as "contains", "manages", "references"),
  "type": optional relation type,
  "attributes": optional object of relation attributes.

Both "source" and "target" must be ids taken from the entities above.
Provide only the JSON array of relations, wrapped in backticks (`) like ```json ... ``` and nothing else."#
    );

    if let Some(filter) = filter {
        prompt.push_str(&format!(
            "\n\nExtract only the relations that are required from the following user prompt:\n\n{filter}"
        ));
    }
    Ok(prompt)
}

/// Per-page value extraction against an already-produced schema.
pub fn data_extraction_prompt(schema_json: &str, filter: Option<&str>) -> String {
    let mut prompt = format!(
        r#"You are provided with a JSON schema, and you have to extract the data following the json schema below;
if you don't find the information insert NA in the field.

JSON Schema:
{schema_json}

I want something like:
```json
{{
  "employee": {{
    "name": "Lorenzo",
    "position": "Software Engineer"
  }},
  "work_details": {{
    "worked_hours": 40,
    "worked_days": 22
  }}
}}
```
Provide only the JSON data, wrapped in backticks (`) like ```json ... ``` and nothing else."#
    );

    if let Some(filter) = filter {
        prompt.push_str(&format!("\n\nAdditional instructions: {filter}"));
    }
    prompt
}

/// Merge the current schema with an externally supplied one.
pub fn schema_update_prompt(existing: &Schema, incoming: &Schema) -> Result<String, serde_json::Error> {
    let existing_json = serde_json::to_string_pretty(existing)?;
    let incoming_json = serde_json::to_string_pretty(incoming)?;
    Ok(format!(
        r#"You need to update the json schema with the new one, avoiding duplicates and reconciling any conflicts. Here are the rules:

1. If the new schema declares a property that already exists, update the existing property with any new or changed structure.
2. Add any completely new properties that don't match existing ones.
3. Try to maintain the base structure of the existing schema.

Existing schema:
{existing_json}

New schema to integrate:
{incoming_json}

Please provide the updated json schema as a JSON object.
Provide only the JSON object, wrapped in backticks (`) like ```json ... ``` and nothing else."#
    ))
}

/// Resolve a natural-language delete request against the current ontology.
/// Relations are addressed by their position label (R1, R2, ...).
pub fn delete_prompt(
    entity_ids: &[&str],
    relations: &[Relation],
    description: &str,
) -> String {
    let relation_labels = relations
        .iter()
        .enumerate()
        .map(|(index, relation)| {
            format!(
                "R{}: {} -[{}]-> {}",
                index + 1,
                relation.source,
                relation.name,
                relation.target
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Based on the following description, determine if the user wants to delete an entity or a relation,
and provide the ID of the item to be deleted. If it's not clear, ask for clarification.

Current entities: {entity_ids:?}
Current relations:
{relation_labels}

User description: {description}

Respond with the following JSON structure:
{{
  "kind": "entity" or "relation" or "none",
  "id": the entity id, or the relation label (e.g. "R2"), or null if unclear,
  "clarification": a clarification question, or null if the request is clear
}}

Remember to provide only the JSON, nothing else before or after the JSON."#
    )
}
