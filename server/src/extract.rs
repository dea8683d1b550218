//! Turning free text, Word documents, photos and PDFs into a recipe form with an LLM.

use crate::api::recipes::form::RecipeForm;
use crate::error::AppError;
use crate::llm::{
    ChatMessage, CompletionRequest, ContentPart, FileData, ImageUrl, LlmProvider, ResponseSchema,
};
use crate::models::Label;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{json, Value};
use std::io::{Cursor, Read};

pub const MAX_TOKENS: u32 = 3000;
pub const MAX_LABELS: usize = 4;
pub const AI_BUGGED_MESSAGE: &str = "So... the AI bugged. Please try again later.";
const DOCX_FAILED_MESSAGE: &str = "Failed to extract text. Try another one.";

/// What the user handed in.
#[derive(Debug, Clone)]
pub enum ExtractionInput {
    Text(String),
    File { filename: String, data: Vec<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Docx,
    Image(&'static str),
    Pdf,
}

fn file_kind(filename: &str) -> Result<FileKind, AppError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => Ok(FileKind::Docx),
        "doc" => Err(AppError::BadRequest(DOCX_FAILED_MESSAGE.to_string())),
        "png" => Ok(FileKind::Image("image/png")),
        "jpg" | "jpeg" => Ok(FileKind::Image("image/jpeg")),
        "webp" => Ok(FileKind::Image("image/webp")),
        "pdf" => Ok(FileKind::Pdf),
        _ => Err(AppError::BadRequest(format!("Unsupported file type: .{}", ext))),
    }
}

/// Plain text of a .docx, one paragraph per line.
pub fn docx_text(data: &[u8]) -> Result<String, AppError> {
    let failed = |detail: String| {
        tracing::info!(error = %detail, "could not read docx");
        AppError::BadRequest(DOCX_FAILED_MESSAGE.to_string())
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| failed(e.to_string()))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| failed(e.to_string()))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| failed(e.to_string()))?;

    let text = document_xml_text(&xml).map_err(|e| failed(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(failed("document has no text".to_string()));
    }
    Ok(text)
}

/// Collects the `<w:t>` text of each run into paragraphs. Tabs and breaks count only
/// inside a run; the `w:tab` entries of `<w:tabs>` are tab stop definitions.
fn document_xml_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(tag) => match tag.name().as_ref() {
                b"w:r" => in_run = true,
                b"w:t" if in_run => in_text = true,
                name if in_run => push_run_mark(&mut current, name),
                _ => {}
            },
            Event::Empty(tag) => match tag.name().as_ref() {
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                name if in_run => push_run_mark(&mut current, name),
                _ => {}
            },
            Event::Text(text) if in_text => current.push_str(&text.unescape()?),
            Event::CData(data) if in_text => {
                current.push_str(&String::from_utf8_lossy(&data.into_inner()))
            }
            Event::End(tag) => match tag.name().as_ref() {
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs
        .iter()
        .map(|p| p.trim_end())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn push_run_mark(text: &mut String, name: &[u8]) {
    match name {
        b"w:tab" => text.push('\t'),
        b"w:br" | b"w:cr" => text.push('\n'),
        _ => {}
    }
}

fn instructions(labels: &[Label], language: &str) -> String {
    let names = labels
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Return this recipe using the JSON format and no other text. Write everything in {language}. \
         Step descriptions can be a bit shorter than the original. \
         For the labels choose between (MAX {max}): {names}. \
         For the ingredients put the numeric value in \"quantity\" and the unit with the ingredient in \"description\", \
         for example {{\"quantity\": 60, \"description\": \"cl of cooking juice\"}}, \
         {{\"quantity\": 120, \"description\": \"g of cornstarch\"}}, \
         {{\"quantity\": 1, \"description\": \"pinch of pepper\"}}. \
         Again, write everything in {language}.",
        language = language,
        max = MAX_LABELS,
        names = names,
    )
}

/// Strict JSON schema of the form the model must return.
pub fn recipe_schema(labels: &[Label]) -> Value {
    let mut label_items = json!({"type": "string"});
    if !labels.is_empty() {
        let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        label_items["enum"] = json!(names);
    }

    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["title", "cooking", "preparation", "servings", "ingredients", "steps", "labels"],
        "properties": {
            "title": {"type": "string"},
            "cooking": {"type": "integer", "minimum": 0},
            "preparation": {"type": "integer", "minimum": 0},
            "servings": {"type": "integer", "minimum": 1},
            "ingredients": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["quantity", "description"],
                    "properties": {
                        "quantity": {"type": "number", "minimum": 0},
                        "description": {"type": "string"}
                    }
                }
            },
            "steps": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["content"],
                    "properties": {"content": {"type": "string"}}
                }
            },
            "labels": {
                "type": "array",
                "minItems": 1,
                "maxItems": MAX_LABELS,
                "items": label_items
            }
        }
    })
}

fn data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(data))
}

/// Builds the completion request for an input. Word documents are read here.
pub fn build_request(
    input: &ExtractionInput,
    labels: &[Label],
    language: &str,
) -> Result<CompletionRequest, AppError> {
    let instructions = instructions(labels, language);
    let mut parse_pdfs = false;

    let message = match input {
        ExtractionInput::Text(text) => {
            if text.trim().is_empty() {
                return Err(AppError::BadRequest("The recipe text is empty".to_string()));
            }
            ChatMessage::user_text(format!("This is the recipe: {}. {}", text.trim(), instructions))
        }
        ExtractionInput::File { filename, data } => {
            if data.is_empty() {
                return Err(AppError::BadRequest("The uploaded file is empty".to_string()));
            }
            match file_kind(filename)? {
                FileKind::Docx => {
                    let text = docx_text(data)?;
                    ChatMessage::user_text(format!("This is the recipe: {}. {}", text, instructions))
                }
                FileKind::Image(mime) => ChatMessage::user_parts(vec![
                    ContentPart::Text {
                        text: format!("This image contains the recipe. {}", instructions),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(mime, data),
                        },
                    },
                ]),
                FileKind::Pdf => {
                    parse_pdfs = true;
                    ChatMessage::user_parts(vec![
                        ContentPart::Text {
                            text: format!("This PDF contains the recipe. {}", instructions),
                        },
                        ContentPart::File {
                            file: FileData {
                                filename: "recipe.pdf".to_string(),
                                file_data: data_url("application/pdf", data),
                            },
                        },
                    ])
                }
            }
        }
    };

    Ok(CompletionRequest {
        messages: vec![message],
        max_tokens: MAX_TOKENS,
        response_schema: Some(ResponseSchema {
            name: "recipe".to_string(),
            schema: recipe_schema(labels),
        }),
        parse_pdfs,
    })
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) on the opening line
    let inner = match inner.find('\n') {
        Some(newline) => &inner[newline + 1..],
        None => inner,
    };
    inner.trim_end().trim_end_matches("```").trim()
}

/// Parses and validates the model's reply as a recipe form.
pub fn parse_reply(reply: &str) -> Result<RecipeForm, AppError> {
    let bugged = |detail: String| AppError::ExtractionFailed {
        message: AI_BUGGED_MESSAGE.to_string(),
        detail,
    };

    let mut form: RecipeForm = serde_json::from_str(strip_code_fences(reply))
        .map_err(|e| bugged(format!("invalid JSON from model: {}", e)))?;
    form.comment = None;
    form.labels.truncate(MAX_LABELS);

    form.validated().map_err(|e| match e {
        AppError::Validation(issues) => bugged(format!(
            "model output failed validation: {}",
            issues
                .iter()
                .map(|i| format!("{}: {}", i.path, i.message))
                .collect::<Vec<_>>()
                .join(", ")
        )),
        other => other,
    })
}

pub async fn extract_recipe(
    provider: &dyn LlmProvider,
    input: &ExtractionInput,
    labels: &[Label],
    language: &str,
) -> Result<RecipeForm, AppError> {
    let request = build_request(input, labels, language)?;
    tracing::info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        "extracting recipe"
    );
    let reply = provider.complete(&request).await?;
    parse_reply(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FakeProvider, MessageContent};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const REPLY: &str = r#"{"title":"Soupe au pistou","cooking":40,"preparation":20,"servings":4,
        "ingredients":[{"quantity":200,"description":"g de haricots blancs"}],
        "steps":[{"content":"Cuire les légumes"}],"labels":["Plat","Végétarien"]}"#;

    fn labels() -> Vec<Label> {
        vec![
            Label {
                id: 1,
                name: "Plat".into(),
                color: "#ef4444".into(),
                sort_order: 1,
            },
            Label {
                id: 2,
                name: "Végétarien".into(),
                color: "#22c55e".into(),
                sort_order: 2,
            },
        ]
    }

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_document_xml_paragraphs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Pâte</w:t></w:r><w:r><w:t xml:space="preserve"> brisée</w:t></w:r></w:p>
            <w:p><w:r><w:t>200 g &amp; 1 œuf</w:t><w:tab/><w:t>x</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>Cuire &#233;</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(
            document_xml_text(xml).unwrap(),
            "Pâte brisée\n200 g & 1 œuf\tx\nCuire é"
        );
    }

    #[test]
    fn test_tab_stop_definitions_are_not_text() {
        let xml = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9000"/></w:tabs></w:pPr><w:r><w:t>Tarte</w:t><w:br/><w:t>Tatin</w:t></w:r></w:p>"#;
        assert_eq!(document_xml_text(xml).unwrap(), "Tarte\nTatin");
    }

    #[test]
    fn test_malformed_document_xml_fails() {
        assert!(document_xml_text("<w:p><w:r><w:t>Tarte</w:r></w:p>").is_err());
    }

    #[test]
    fn test_docx_text_reads_archive() {
        let data = docx_with("<w:p><w:r><w:t>Tarte</w:t></w:r></w:p>");
        assert_eq!(docx_text(&data).unwrap(), "Tarte");
    }

    #[test]
    fn test_docx_failures() {
        let err = docx_text(b"not a zip").unwrap_err();
        assert_eq!(err.to_string(), DOCX_FAILED_MESSAGE);

        let empty = docx_with("<w:p></w:p>");
        assert!(docx_text(&empty).is_err());
    }

    #[test]
    fn test_file_kinds() {
        assert_eq!(file_kind("Recipe.DOCX").unwrap(), FileKind::Docx);
        assert_eq!(file_kind("photo.jpeg").unwrap(), FileKind::Image("image/jpeg"));
        assert_eq!(file_kind("scan.pdf").unwrap(), FileKind::Pdf);
        assert_eq!(
            file_kind("old.doc").unwrap_err().to_string(),
            DOCX_FAILED_MESSAGE
        );
        assert_eq!(
            file_kind("notes.txt").unwrap_err().to_string(),
            "Unsupported file type: .txt"
        );
    }

    #[test]
    fn test_text_request() {
        let request = build_request(
            &ExtractionInput::Text("Une soupe".into()),
            &labels(),
            "French",
        )
        .unwrap();
        assert_eq!(request.max_tokens, MAX_TOKENS);
        assert!(!request.parse_pdfs);
        let prompt = request.prompt_text();
        assert!(prompt.starts_with("This is the recipe: Une soupe."));
        assert!(prompt.contains("Plat, Végétarien"));
        assert!(prompt.contains("Write everything in French"));
        let schema = &request.response_schema.unwrap().schema;
        assert_eq!(schema["properties"]["labels"]["items"]["enum"][1], "Végétarien");
        assert_eq!(schema["properties"]["labels"]["maxItems"], 4);
    }

    #[test]
    fn test_image_and_pdf_requests_attach_data_urls() {
        let image = build_request(
            &ExtractionInput::File {
                filename: "photo.png".into(),
                data: vec![1, 2, 3],
            },
            &labels(),
            "French",
        )
        .unwrap();
        let MessageContent::Parts(parts) = &image.messages[0].content else {
            panic!("expected parts");
        };
        assert!(matches!(
            &parts[1],
            ContentPart::ImageUrl { image_url } if image_url.url == "data:image/png;base64,AQID"
        ));

        let pdf = build_request(
            &ExtractionInput::File {
                filename: "recipe.pdf".into(),
                data: vec![1, 2, 3],
            },
            &labels(),
            "French",
        )
        .unwrap();
        assert!(pdf.parse_pdfs);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(build_request(&ExtractionInput::Text("  ".into()), &labels(), "French").is_err());
        assert!(build_request(
            &ExtractionInput::File {
                filename: "a.png".into(),
                data: vec![]
            },
            &labels(),
            "French"
        )
        .is_err());
    }

    #[test]
    fn test_parse_reply_strips_fences() {
        let fenced = format!("```json\n{}\n```", REPLY);
        let form = parse_reply(&fenced).unwrap();
        assert_eq!(form.title, "Soupe au pistou");
        assert_eq!(form.labels, vec!["Plat", "Végétarien"]);
        assert_eq!(parse_reply(REPLY).unwrap(), form);
    }

    #[test]
    fn test_parse_reply_rejects_invalid_output() {
        let err = parse_reply("I could not find a recipe").unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailed { ref message, .. } if message == AI_BUGGED_MESSAGE));

        let no_steps = REPLY.replace(r#"[{"content":"Cuire les légumes"}]"#, "[]");
        assert!(matches!(
            parse_reply(&no_steps),
            Err(AppError::ExtractionFailed { .. })
        ));
    }

    #[test]
    fn test_parse_reply_caps_labels() {
        let many = REPLY.replace(
            r#"["Plat","Végétarien"]"#,
            r#"["Plat","Végétarien","Four","Sauce","Grill"]"#,
        );
        assert_eq!(parse_reply(&many).unwrap().labels.len(), MAX_LABELS);
    }

    #[tokio::test]
    async fn test_extract_recipe_with_fake_provider() {
        let provider = FakeProvider::with_response("pistou", REPLY);
        let form = extract_recipe(
            &provider,
            &ExtractionInput::Text("soupe au pistou de mamie".into()),
            &labels(),
            "French",
        )
        .await
        .unwrap();
        assert_eq!(form.servings, 4);
        assert_eq!(provider.requests().len(), 1);
    }
}
