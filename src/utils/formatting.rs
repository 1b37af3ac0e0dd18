/// Replace `:name` tokens in a pattern with the supplied values.
/// Unknown tokens are left untouched.
pub fn apply_pattern_string(pattern: &str, vars: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();
    for (name, value) in vars {
        result = result.replace(&format!(":{name}"), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::apply_pattern_string;

    #[test]
    fn replaces_known_tokens() {
        let result = apply_pattern_string(
            "Hello :user, read :rules.",
            &[("user", "<@1>"), ("rules", "<#2>")],
        );
        assert_eq!(result, "Hello <@1>, read <#2>.");
    }

    #[test]
    fn leaves_unknown_tokens() {
        let result = apply_pattern_string("Hello :user", &[("rules", "<#2>")]);
        assert_eq!(result, "Hello :user");
    }

    #[test]
    fn repeated_tokens_all_replaced() {
        let result = apply_pattern_string(":a :a", &[("a", "x")]);
        assert_eq!(result, "x x");
    }
}
