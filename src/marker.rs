use quick_xml::events::{BytesEnd, BytesStart};

use crate::track_cues::MEMORY_CUE_NUM;

pub(crate) const POSITION_MARK_TAG: &str = "POSITION_MARK";

/// Builds the `<POSITION_MARK ...></POSITION_MARK>` pair for a memory cue at
/// `start`. Attribute order matches what rekordbox itself writes: Name, Type,
/// Start, Num. The writer escapes attribute values on emission.
pub(crate) fn missing_cue_events(start: &str) -> (BytesStart<'static>, BytesEnd<'static>) {
    let mut open = BytesStart::new(POSITION_MARK_TAG);
    open.push_attribute(("Name", ""));
    open.push_attribute(("Type", "0"));
    open.push_attribute(("Start", start));
    open.push_attribute(("Num", MEMORY_CUE_NUM));

    (open, BytesEnd::new(POSITION_MARK_TAG))
}
