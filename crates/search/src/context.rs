/// Join retrieved chunk texts into one prompt context, nearest first,
/// separated by a blank line.
pub fn join_context<S: AsRef<str>>(chunks: &[S]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(chunk.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_blank_lines_in_order() {
        assert_eq!(join_context(&["first", "second", "third"]), "first\n\nsecond\n\nthird");
    }

    #[test]
    fn empty_and_single_inputs() {
        assert_eq!(join_context::<&str>(&[]), "");
        assert_eq!(join_context(&["only"]), "only");
    }
}
