use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const LOW_RES_PREFIX: &str = "480_";
pub const HIGH_RES_PREFIX: &str = "1080_";
pub const ORIGINAL_PREFIX: &str = "original_";

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Uuid,
    pub category: Uuid,
    pub low_res: String,
    pub high_res: String,
    pub full_photo: String,
}

impl Photo {
    /// Builds the record for a staged upload, naming each variant after the source file.
    pub fn for_upload(category: Uuid, file_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            low_res: format!("{}{}", LOW_RES_PREFIX, file_name),
            high_res: format!("{}{}", HIGH_RES_PREFIX, file_name),
            full_photo: format!("{}{}", ORIGINAL_PREFIX, file_name),
        }
    }

    pub fn object_names(&self) -> [&str; 3] {
        [&self.low_res, &self.high_res, &self.full_photo]
    }
}

#[derive(Debug, Clone)]
pub struct PhotoPage {
    pub photos: Vec<Photo>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
}

impl PhotoPage {
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_items.div_ceil(self.size as u64)
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPageResponse {
    pub photos: Vec<Photo>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
}

impl From<PhotoPage> for PhotoPageResponse {
    fn from(page: PhotoPage) -> Self {
        let total_pages = page.total_pages();
        Self {
            photos: page.photos,
            current_page: page.page,
            total_pages,
            total_items: page.total_items,
        }
    }
}
