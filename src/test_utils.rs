pub mod test_helpers {
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;

    use crate::document::{
        Backend, BackendDocument, BackendError, BackendPage, ChannelOrder, IRect, Matrix,
        OutlineGraph, Rect, RenderedBuffer,
    };

    /// Native-order sample values written by [`FakePage::render`]
    pub const FAKE_BGRA: [u8; 4] = [0x10, 0x20, 0x30, 0xFF];
    /// Filler for the row padding of fake buffers
    pub const FAKE_PADDING: u8 = 0xEE;
    /// Extra bytes at the end of every fake row
    pub const FAKE_ROW_PADDING: usize = 8;

    /// Calls observed by a [`FakeBackend`] and everything it opened
    #[derive(Debug, Default)]
    pub struct FakeCounters {
        pub opens: Cell<usize>,
        pub repairs: Cell<usize>,
        pub page_loads: Cell<usize>,
        pub renders: Cell<usize>,
        pub flushes: Cell<usize>,
        pub pages_alive: Cell<usize>,
    }

    fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct FakePageSpec {
        pub width: f32,
        pub height: f32,
        pub rotation: i32,
    }

    impl FakePageSpec {
        pub fn new(width: f32, height: f32) -> Self {
            Self {
                width,
                height,
                rotation: 0,
            }
        }

        pub fn rotated(mut self, rotation: i32) -> Self {
            self.rotation = rotation;
            self
        }
    }

    /// US Letter in points
    pub const LETTER: FakePageSpec = FakePageSpec {
        width: 612.0,
        height: 792.0,
        rotation: 0,
    };

    /// In-memory document backend. Outline destinations are 1-based page
    /// numbers.
    #[derive(Clone, Debug)]
    pub struct FakeBackend {
        pages: Vec<FakePageSpec>,
        password: Option<String>,
        title: Option<String>,
        outline: Option<OutlineGraph<usize>>,
        corrupt: bool,
        unrepairable: bool,
        failing_page: Option<usize>,
        failing_render: Option<usize>,
        counters: Rc<FakeCounters>,
    }

    impl FakeBackend {
        /// `count` letter-sized pages
        pub fn with_pages(count: usize) -> Self {
            Self::with_page_specs(vec![LETTER; count])
        }

        pub fn with_page_specs(pages: Vec<FakePageSpec>) -> Self {
            Self {
                pages,
                password: None,
                title: None,
                outline: None,
                corrupt: false,
                unrepairable: false,
                failing_page: None,
                failing_render: None,
                counters: Rc::new(FakeCounters::default()),
            }
        }

        pub fn password(mut self, password: &str) -> Self {
            self.password = Some(password.to_string());
            self
        }

        pub fn title(mut self, title: &str) -> Self {
            self.title = Some(title.to_string());
            self
        }

        pub fn outline(mut self, outline: OutlineGraph<usize>) -> Self {
            self.outline = Some(outline);
            self
        }

        /// First open fails; the repair pass succeeds
        pub fn corrupt(mut self) -> Self {
            self.corrupt = true;
            self
        }

        /// Both open and repair fail
        pub fn unrepairable(mut self) -> Self {
            self.corrupt = true;
            self.unrepairable = true;
            self
        }

        pub fn failing_page(mut self, page_number: usize) -> Self {
            self.failing_page = Some(page_number);
            self
        }

        pub fn failing_render(mut self, page_number: usize) -> Self {
            self.failing_render = Some(page_number);
            self
        }

        pub fn counters(&self) -> Rc<FakeCounters> {
            Rc::clone(&self.counters)
        }

        fn document(&self) -> FakeDocument {
            FakeDocument {
                pages: self.pages.clone(),
                password: self.password.clone(),
                unlocked: false,
                title: self.title.clone(),
                outline: self.outline.clone(),
                failing_page: self.failing_page,
                failing_render: self.failing_render,
                counters: Rc::clone(&self.counters),
            }
        }
    }

    impl Backend for FakeBackend {
        type Document = FakeDocument;

        fn open(&self, path: &Path) -> Result<FakeDocument, BackendError> {
            bump(&self.counters.opens);
            if self.corrupt {
                return Err(BackendError::new(format!(
                    "{}: cannot find xref table",
                    path.display()
                )));
            }
            Ok(self.document())
        }

        fn repair(&self, path: &Path) -> Result<FakeDocument, BackendError> {
            bump(&self.counters.repairs);
            if self.unrepairable {
                return Err(BackendError::new(format!(
                    "{}: no objects found",
                    path.display()
                )));
            }
            Ok(self.document())
        }
    }

    #[derive(Debug)]
    pub struct FakeDocument {
        pages: Vec<FakePageSpec>,
        password: Option<String>,
        unlocked: bool,
        title: Option<String>,
        outline: Option<OutlineGraph<usize>>,
        failing_page: Option<usize>,
        failing_render: Option<usize>,
        counters: Rc<FakeCounters>,
    }

    impl BackendDocument for FakeDocument {
        type Page = FakePage;
        type Destination = usize;

        fn needs_password(&self) -> bool {
            self.password.is_some()
        }

        fn authenticate(&mut self, password: &str) -> bool {
            self.unlocked = self.password.as_deref() == Some(password);
            self.unlocked
        }

        fn page_count(&self) -> Result<usize, BackendError> {
            Ok(self.pages.len())
        }

        fn load_page(&self, page_number: usize) -> Result<FakePage, BackendError> {
            bump(&self.counters.page_loads);
            if self.failing_page == Some(page_number) {
                return Err(BackendError::new(format!(
                    "Cannot load page {page_number}: broken content stream"
                )));
            }
            let spec = page_number
                .checked_sub(1)
                .and_then(|i| self.pages.get(i))
                .copied()
                .ok_or_else(|| BackendError::new(format!("No page {page_number}")))?;

            bump(&self.counters.pages_alive);
            Ok(FakePage {
                number: page_number,
                spec,
                fail_render: self.failing_render == Some(page_number),
                counters: Rc::clone(&self.counters),
            })
        }

        fn load_outline(&self) -> Option<OutlineGraph<usize>> {
            self.outline.clone()
        }

        fn resolve_page_number(&self, destination: &usize) -> Option<usize> {
            (1..=self.pages.len())
                .contains(destination)
                .then_some(*destination)
        }

        fn title(&self) -> Option<String> {
            self.title.clone()
        }

        fn flush(&mut self) -> Result<(), BackendError> {
            bump(&self.counters.flushes);
            Ok(())
        }
    }

    #[derive(Debug)]
    pub struct FakePage {
        number: usize,
        spec: FakePageSpec,
        fail_render: bool,
        counters: Rc<FakeCounters>,
    }

    impl FakePage {
        pub fn number(&self) -> usize {
            self.number
        }
    }

    impl Drop for FakePage {
        fn drop(&mut self) {
            let alive = self.counters.pages_alive.get();
            self.counters.pages_alive.set(alive.saturating_sub(1));
        }
    }

    impl BackendPage for FakePage {
        fn bounds(&self) -> Result<Rect, BackendError> {
            Ok(Rect::new(0.0, 0.0, self.spec.width, self.spec.height))
        }

        fn rotation(&self) -> i32 {
            self.spec.rotation
        }

        /// Fills the clip with [`FAKE_BGRA`] pixels, padding every row with
        /// [`FAKE_ROW_PADDING`] bytes of [`FAKE_PADDING`].
        fn render(&self, _transform: &Matrix, clip: IRect) -> Result<RenderedBuffer, BackendError> {
            bump(&self.counters.renders);
            if self.fail_render {
                return Err(BackendError::new(format!(
                    "Rasterizer ran out of memory on page {}",
                    self.number
                )));
            }

            let (width, height) = (clip.width(), clip.height());
            let row = width as usize * 4;
            let stride = row + FAKE_ROW_PADDING;
            let mut samples = Vec::with_capacity(stride * height as usize);
            for _ in 0..height {
                for _ in 0..width {
                    samples.extend_from_slice(&FAKE_BGRA);
                }
                samples.resize(samples.len() + FAKE_ROW_PADDING, FAKE_PADDING);
            }

            RenderedBuffer::new(width, height, 4, stride, ChannelOrder::Bgra, samples)
                .map_err(|e| BackendError::new(e.to_string()))
        }
    }

    /// Outline shaped like a small book:
    ///
    /// ```text
    /// Part I            1
    ///   Chapter 1       2
    ///   Chapter 2       5
    ///     Section 2.1   6
    /// Part II           8
    /// Colophon          (no target)
    /// ```
    pub fn book_outline() -> OutlineGraph<usize> {
        let mut graph = OutlineGraph::new();
        let part1 = graph.add("Part I", Some(1));
        let ch1 = graph.add("Chapter 1", Some(2));
        let ch2 = graph.add("Chapter 2", Some(5));
        let sec21 = graph.add("Section 2.1", Some(6));
        let part2 = graph.add("Part II", Some(8));
        let colophon = graph.add("Colophon", None);

        graph.set_first(part1);
        graph.set_child(part1, ch1);
        graph.set_next(ch1, ch2);
        graph.set_child(ch2, sec21);
        graph.set_next(part1, part2);
        graph.set_next(part2, colophon);
        graph
    }

    /// A single chain `depth` levels deep, each node pointing at page 1
    pub fn deep_outline(depth: usize) -> OutlineGraph<usize> {
        let mut graph = OutlineGraph::new();
        let mut parent = None;
        for level in 0..depth {
            let id = graph.add(format!("Level {level}"), Some(1));
            match parent {
                Some(parent) => graph.set_child(parent, id),
                None => graph.set_first(id),
            }
            parent = Some(id);
        }
        graph
    }

    /// `count` top-level siblings, titled in order
    pub fn flat_outline(count: usize) -> OutlineGraph<usize> {
        let mut graph = OutlineGraph::new();
        let mut prev = None;
        for i in 0..count {
            let id = graph.add(format!("Entry {i}"), Some(i + 1));
            match prev {
                Some(prev) => graph.set_next(prev, id),
                None => graph.set_first(id),
            }
            prev = Some(id);
        }
        graph
    }
}
