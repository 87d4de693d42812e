use compact_str::CompactString;

/// Matched words of one hit: word positions `first..=last`, byte range
/// `start..end` of the string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtSpan {
    pub first: usize,
    pub last: usize,
    pub start: usize,
    pub end: usize,
}

/// Side channel for highlighting: receives the hit spans of every positive
/// match on a stored node.
pub trait FtSink {
    fn record(&mut self, doc: &str, pre: usize, spans: &[FtSpan]);
}

impl<S: FtSink + ?Sized> FtSink for &mut S {
    fn record(&mut self, doc: &str, pre: usize, spans: &[FtSpan]) {
        (**self).record(doc, pre, spans);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtHit {
    pub doc: CompactString,
    pub pre: usize,
    pub spans: Vec<FtSpan>,
}

/// In-memory sink keeping all hits in recording order.
#[derive(Debug, Clone, Default)]
pub struct FtPositions {
    hits: Vec<FtHit>,
}

impl FtPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> &[FtHit] {
        &self.hits
    }

    pub fn get(&self, doc: &str, pre: usize) -> Option<&[FtSpan]> {
        self.hits.iter().find(|h| h.doc == doc && h.pre == pre).map(|h| h.spans.as_slice())
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl FtSink for FtPositions {
    fn record(&mut self, doc: &str, pre: usize, spans: &[FtSpan]) {
        match self.hits.iter_mut().find(|h| h.doc == doc && h.pre == pre) {
            Some(hit) => hit.spans.extend_from_slice(spans),
            None => self.hits.push(FtHit { doc: CompactString::from(doc), pre, spans: spans.to_vec() }),
        }
    }
}
