use scraper::ElementRef;

/// Closest element sibling preceding `el`, skipping text and comment nodes.
pub(crate) fn prev_element<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.prev_siblings().find_map(ElementRef::wrap)
}

/// Parent of `el` when the parent is itself an element.
pub(crate) fn parent_element<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.parent().and_then(ElementRef::wrap)
}

/// All text inside `el`, concatenated.
pub(crate) fn text_of(el: ElementRef) -> String {
    el.text().collect()
}
