//! Plain-text rendering of results

use std::io::{Result as IoResult, Write};

use console::style;
use wordlens_client::{BulkImages, ImageResult, SearchView};
use wordlens_core::EmbeddingResult;

/// Components shown before an embedding preview is cut off.
const PREVIEW_COMPONENTS: usize = 5;

/// Formats a vector, truncated to a preview unless `full`.
pub fn format_vector(values: &[f64], full: bool) -> String {
    let shown = if full {
        values.len()
    } else {
        values.len().min(PREVIEW_COMPONENTS)
    };
    let mut parts: Vec<String> = values
        .iter()
        .take(shown)
        .map(|value| format!("{value:.4}"))
        .collect();
    if shown < values.len() {
        parts.push("…".to_owned());
    }
    format!("[{}] ({} dims)", parts.join(", "), values.len())
}

/// One-line description of an image.
pub fn describe_image(image: &ImageResult) -> String {
    format!(
        "{}x{} {} ({} bytes)",
        image.width,
        image.height,
        image.extension(),
        image.bytes.len()
    )
}

/// File name for a word's image: unsafe characters become `_`.
pub fn image_file_name(word: &str, extension: &str) -> String {
    let stem: String = word
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    format!("{stem}.{extension}")
}

/// Writes a search result: neighbors with distances and image markers.
///
/// # Errors
/// Returns an error if writing fails
pub fn render_search(out: &mut impl Write, view: &SearchView) -> IoResult<()> {
    writeln!(
        out,
        "{} {} (limit {})",
        style("Nearest to").bold(),
        style(view.query.text()).cyan(),
        view.query.limit()
    )?;
    for (rank, entry) in view.entries().iter().enumerate() {
        let image = entry
            .image
            .map_or_else(|| "no image".to_owned(), describe_image);
        writeln!(
            out,
            "{:>3}. {:<20} {:.4}  {}",
            rank + 1,
            entry.neighbor.word,
            entry.neighbor.distance,
            style(image).dim()
        )?;
    }
    Ok(())
}

/// Writes each query word's embedding and the average, if any.
///
/// # Errors
/// Returns an error if writing fails
pub fn render_embeddings(
    out: &mut impl Write,
    result: &EmbeddingResult,
    full: bool,
) -> IoResult<()> {
    for (word, embedding) in result.words.iter().zip(&result.embeddings) {
        writeln!(out, "{} {}", style(word).cyan(), format_vector(embedding, full))?;
    }
    if let Some(average) = &result.average_embedding {
        writeln!(out, "{} {}", style("average").bold(), format_vector(average, full))?;
    }
    Ok(())
}

/// Writes a single image summary.
///
/// # Errors
/// Returns an error if writing fails
pub fn render_image(out: &mut impl Write, image: &ImageResult) -> IoResult<()> {
    writeln!(out, "{} {}", style(&image.label).cyan(), describe_image(image))
}

/// Writes a bulk result, listing requested words that came back without an image.
///
/// # Errors
/// Returns an error if writing fails
pub fn render_bulk(out: &mut impl Write, requested: &[String], images: &BulkImages) -> IoResult<()> {
    for word in requested {
        match images.get(word) {
            Some(image) => writeln!(out, "{} {}", style(word).cyan(), describe_image(image))?,
            None => writeln!(out, "{} {}", style(word).cyan(), style("no image").dim())?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordlens_client::mock::sample_png_base64;

    #[test]
    fn test_vector_preview() {
        let values = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        assert_eq!(
            format_vector(&values, false),
            "[0.1000, 0.2000, 0.3000, 0.4000, 0.5000, …] (7 dims)"
        );
        assert!(format_vector(&values, true).contains("0.7000"));
        assert_eq!(format_vector(&[1.0], false), "[1.0000] (1 dims)");
    }

    #[test]
    fn test_image_file_name_is_sanitized() {
        assert_eq!(image_file_name("new york", "png"), "new_york.png");
        assert_eq!(image_file_name("../etc", "jpg"), "___etc.jpg");
        assert_eq!(image_file_name("café", "png"), "café.png");
    }

    #[test]
    fn test_render_bulk_marks_missing_words() {
        let image = ImageResult::from_base64("cat", &sample_png_base64(2, 2).expect("png"))
            .expect("decode");
        let mut images = BulkImages::new();
        images.insert("cat".to_owned(), image);

        let mut out = Vec::new();
        render_bulk(&mut out, &["cat".to_owned(), "dog".to_owned()], &images).expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("2x2 png"));
        assert!(text.lines().any(|line| line.contains("dog") && line.contains("no image")));
    }

    #[test]
    fn test_render_embeddings_includes_average() {
        let result = EmbeddingResult {
            words: vec!["cat".to_owned()],
            embeddings: vec![vec![0.25, 0.5]],
            average_embedding: Some(vec![0.25, 0.5]),
        };
        let mut out = Vec::new();
        render_embeddings(&mut out, &result, false).expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("[0.2500, 0.5000] (2 dims)"));
    }
}
