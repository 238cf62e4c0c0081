/// SETTINGS identifiers (RFC 7540 §6.5.2).
///
/// The emission order of the pairs in the first SETTINGS frame is part of
/// the HTTP/2 fingerprint, so profiles carry an explicit order list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingId {
    HeaderTableSize,
    EnablePush,
    MaxConcurrentStreams,
    InitialWindowSize,
    MaxFrameSize,
    MaxHeaderListSize,
}

impl SettingId {
    pub(crate) fn wire_id(&self) -> u16 {
        match self {
            SettingId::HeaderTableSize => 0x1,
            SettingId::EnablePush => 0x2,
            SettingId::MaxConcurrentStreams => 0x3,
            SettingId::InitialWindowSize => 0x4,
            SettingId::MaxFrameSize => 0x5,
            SettingId::MaxHeaderListSize => 0x6,
        }
    }
}

/// HTTP/2 pseudo-header identifiers, used to express per-browser ordering
/// of `:method`, `:scheme`, `:authority` and `:path`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PseudoId {
    Method,
    Scheme,
    Authority,
    Path,
}

/// The HTTP/2 half of a browser profile.
#[derive(Clone, Debug)]
pub struct Http2Settings {
    /// SETTINGS_HEADER_TABLE_SIZE.
    pub header_table_size: Option<u32>,

    /// SETTINGS_ENABLE_PUSH.
    pub enable_push: Option<bool>,

    /// SETTINGS_MAX_CONCURRENT_STREAMS.
    pub max_concurrent_streams: Option<u32>,

    /// SETTINGS_INITIAL_WINDOW_SIZE.
    pub initial_stream_window_size: Option<u32>,

    /// SETTINGS_MAX_FRAME_SIZE.
    pub max_frame_size: Option<u32>,

    /// SETTINGS_MAX_HEADER_LIST_SIZE.
    pub max_header_list_size: Option<u32>,

    /// Emission order of the SETTINGS pairs above.
    pub settings_order: &'static [SettingId],

    /// Increment of the WINDOW_UPDATE sent on stream 0 right after the
    /// SETTINGS frame.
    pub connection_window_update: u32,

    /// Pseudo-header order on HEADERS frames.
    pub headers_pseudo_order: [PseudoId; 4],

    /// Priority bits on the request HEADERS frame:
    /// (stream dependency, weight, exclusive).
    pub headers_priority: Option<(u32, u8, bool)>,
}

impl Http2Settings {
    /// The (id, value) pairs of the connection preface SETTINGS frame, in
    /// the profile's order. Unset identifiers are not emitted.
    pub fn settings_pairs(&self) -> Vec<(u16, u32)> {
        let mut pairs = Vec::with_capacity(self.settings_order.len());
        for id in self.settings_order {
            let value = match id {
                SettingId::HeaderTableSize => self.header_table_size,
                SettingId::EnablePush => self.enable_push.map(u32::from),
                SettingId::MaxConcurrentStreams => self.max_concurrent_streams,
                SettingId::InitialWindowSize => self.initial_stream_window_size,
                SettingId::MaxFrameSize => self.max_frame_size,
                SettingId::MaxHeaderListSize => self.max_header_list_size,
            };
            if let Some(value) = value {
                pairs.push((id.wire_id(), value));
            }
        }
        pairs
    }
}

impl Default for Http2Settings {
    fn default() -> Self {
        Http2Settings {
            header_table_size: None,
            enable_push: None,
            max_concurrent_streams: None,
            initial_stream_window_size: None,
            max_frame_size: None,
            max_header_list_size: None,
            settings_order: &[
                SettingId::HeaderTableSize,
                SettingId::EnablePush,
                SettingId::MaxConcurrentStreams,
                SettingId::InitialWindowSize,
                SettingId::MaxFrameSize,
                SettingId::MaxHeaderListSize,
            ],
            connection_window_update: 15_663_105,
            headers_pseudo_order: [
                PseudoId::Method,
                PseudoId::Authority,
                PseudoId::Scheme,
                PseudoId::Path,
            ],
            headers_priority: None,
        }
    }
}
