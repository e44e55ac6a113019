//! Page capture: serialises the live body subtree into a [`DomSnapshot`].

use eoka::Page;
use tracing::debug;

use crate::snapshot::DomSnapshot;
use crate::Result;

/// JavaScript that walks the body pre-order and emits the snapshot format.
///
/// Rendered text is read only for boxes that are on screen; nothing else can
/// end up in a report and `innerText` forces layout per call.
const CAPTURE_JS: &str = r#"
(() => {
    const vw = window.innerWidth || document.documentElement.clientWidth;
    const vh = window.innerHeight || document.documentElement.clientHeight;
    const out = {
        url: window.location.href,
        title: document.title,
        viewport: { width: vw, height: vh, scrollX: window.scrollX, scrollY: window.scrollY },
        nodes: [],
    };
    const body = document.body;
    if (!body) return JSON.stringify(out);

    const stack = [[body, null]];
    while (stack.length) {
        const [el, parent] = stack.pop();
        const index = out.nodes.length;
        const rect = el.getBoundingClientRect();
        const s = window.getComputedStyle(el);
        const w = el.offsetWidth || 0;
        const h = el.offsetHeight || 0;

        const attrs = [];
        for (const a of el.attributes) attrs.push([a.name, a.value]);

        const onScreen = w > 0 && h > 0 &&
            rect.top >= 0 && rect.left >= 0 && rect.bottom <= vh && rect.right <= vw;

        out.nodes.push({
            parent,
            tag: el.tagName.toLowerCase(),
            attrs,
            style: { display: s.display, visibility: s.visibility, opacity: s.opacity, cursor: s.cursor },
            rect: { x: rect.x, y: rect.y, width: rect.width, height: rect.height },
            offset: [w, h],
            text: onScreen ? (el.innerText || el.textContent || '') : '',
            typeProp: typeof el.type === 'string' ? el.type : null,
        });

        const kids = el.children;
        for (let i = kids.length - 1; i >= 0; i--) stack.push([kids[i], index]);
    }
    return JSON.stringify(out);
})()
"#;

/// Capture the page as it is right now.
///
/// Fails with [`crate::Error::DomUnavailable`] if the page has no body yet.
pub async fn capture(page: &Page) -> Result<DomSnapshot> {
    let json: String = page.evaluate(CAPTURE_JS).await?;
    let doc = DomSnapshot::from_json(&json)?;
    debug!("captured {} elements", doc.len());
    Ok(doc)
}
