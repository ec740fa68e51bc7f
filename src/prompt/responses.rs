//! Content blocks attached to messages sent to the model.

use crate::llm::ContentPart;

use super::image_payload;

/// One image part per payload, in the order given.
pub fn image_blocks(images: &[String]) -> Vec<ContentPart> {
    images
        .iter()
        .map(|image| {
            let (media_type, data) = image_payload(image);
            ContentPart::image(media_type, data)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_blocks_keep_order_and_media_types() {
        let images = vec![
            "data:image/jpeg;base64,/9j/4AAQ".to_string(),
            "R0lGODlhAQABAIAAAP".to_string(),
        ];
        let blocks = image_blocks(&images);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], ContentPart::image("image/jpeg", "/9j/4AAQ"));
        assert_eq!(blocks[1], ContentPart::image("image/gif", "R0lGODlhAQABAIAAAP"));
    }

    #[test]
    fn test_image_blocks_empty() {
        assert!(image_blocks(&[]).is_empty());
    }
}
