pub fn is_framework_compatible(host_frameworks: &[String], target: &str) -> bool {
    let target = target.trim();
    if target.is_empty() || target.eq_ignore_ascii_case("any") {
        return true;
    }
    host_frameworks
        .iter()
        .any(|framework| framework.trim().eq_ignore_ascii_case(target))
}
