/// Joins `items` the way an English sentence would: `a`, `a, and b`, `a, b, and c`.
///
/// `conj` is inserted before the last item, e.g. `", or "`.
pub fn english_enumerate<I, S>(items: I, conj: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut iter = items.into_iter();
    let mut buf = match iter.next() {
        Some(first) => first.as_ref().to_string(),
        None => return String::new(),
    };

    let mut last: Option<S> = None;
    for item in iter {
        if let Some(prev) = last.replace(item) {
            buf.push_str(", ");
            buf.push_str(prev.as_ref());
        }
    }
    if let Some(last) = last {
        buf.push_str(conj);
        buf.push_str(last.as_ref());
    }
    buf
}

pub const AND: &str = ", and ";
pub const OR: &str = ", or ";
