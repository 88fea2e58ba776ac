//! Bounded preview-image cache.
//!
//! Thumbnails are cheap to recapture, so eviction is approximate: once the
//! table grows past its capacity the older half (by insertion order) is
//! dropped in one go.  Every overlay session invalidates the entries it is
//! about to show before capturing them again, which keeps images from a
//! previous session off the screen while still letting repeated `Advance`
//! calls within one session reuse what was captured.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::window::WindowId;

/// A pre-scaled preview image.  Clones share the pixel buffer.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    image: Arc<RgbaImage>,
    placeholder: bool,
}

impl Thumbnail {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
            placeholder: false,
        }
    }

    /// Scale `image` down to fit inside `max_width × max_height`, keeping
    /// the aspect ratio.  Images that already fit are left as they are.
    pub fn scaled(image: DynamicImage, max_width: u32, max_height: u32) -> Self {
        let fits = image.width() <= max_width && image.height() <= max_height;
        let image = if fits {
            image
        } else {
            image.resize(max_width, max_height, FilterType::Triangle)
        };
        Self::new(image.to_rgba8())
    }

    /// Flat grey stand-in shown when capture fails.
    pub fn placeholder(width: u32, height: u32) -> Self {
        let image = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([48, 48, 48, 255]));
        Self {
            image: Arc::new(image),
            placeholder: true,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    thumbnail: Thumbnail,
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<WindowId, Entry>,
    next_seq: u64,
}

/// Thread-safe cache from [`WindowId`] to [`Thumbnail`].
///
/// Holds at most `capacity` entries.  The mutex is only held for the map
/// operation itself; capturing happens outside.
#[derive(Debug)]
pub struct ThumbnailCache {
    capacity: usize,
    table: Mutex<Table>,
}

impl ThumbnailCache {
    /// Default capacity.
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            table: Mutex::new(Table::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, id: WindowId) -> Option<Thumbnail> {
        self.lock().entries.get(&id).map(|e| e.thumbnail.clone())
    }

    pub fn invalidate(&self, id: WindowId) {
        self.lock().entries.remove(&id);
    }

    /// Invalidate every id in `ids` under a single lock.
    pub fn invalidate_all<'a>(&self, ids: impl IntoIterator<Item = &'a WindowId>) {
        let mut table = self.lock();
        for id in ids {
            table.entries.remove(id);
        }
    }

    /// Insert (or replace) the thumbnail for `id`, then evict the oldest
    /// half if the table is over capacity.
    ///
    /// The entry just inserted is always the newest, so it survives the
    /// eviction it may trigger.
    pub fn cap_insert(&self, id: WindowId, thumbnail: Thumbnail) {
        let mut table = self.lock();
        let seq = table.next_seq;
        table.next_seq += 1;
        table.entries.insert(id, Entry { seq, thumbnail });

        if table.entries.len() > self.capacity {
            let mut by_age: Vec<(u64, WindowId)> =
                table.entries.iter().map(|(id, e)| (e.seq, *id)).collect();
            by_age.sort_unstable_by_key(|(seq, _)| *seq);
            let evict = table.entries.len() / 2;
            for (_, old) in by_age.into_iter().take(evict) {
                table.entries.remove(&old);
            }
            debug!(
                "thumbnail cache over capacity, evicted {} entries ({} left)",
                evict,
                table.entries.len()
            );
        }
    }

    /// Drop entries whose id is not accepted by `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&WindowId) -> bool) {
        self.lock().entries.retain(|id, _| keep(id));
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

//  Tests
