// Raw key/value pairs in request order, repeated keys allowed
pub type Params = Vec<(String, String)>;

// First value for `name`, like URLSearchParams.get
pub fn first_param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

// /admin/unblock query string
#[derive(Debug, Default)]
pub struct AdminUnblockQuery {
    pub student: Option<String>,
    pub key: Option<String>,
}

impl From<Params> for AdminUnblockQuery {
    fn from(params: Params) -> Self {
        Self {
            student: first_param(&params, "student"),
            key: first_param(&params, "key"),
        }
    }
}

// /captcha query string
#[derive(Debug, Default)]
pub struct CaptchaQuery {
    pub student: Option<String>,
}

impl From<Params> for CaptchaQuery {
    fn from(params: Params) -> Self {
        Self {
            student: first_param(&params, "student"),
        }
    }
}

// /captcha/verify form body
#[derive(Debug, Default)]
pub struct CaptchaVerifyForm {
    pub student: Option<String>,
    pub proof: Option<String>,
}

impl From<Params> for CaptchaVerifyForm {
    fn from(params: Params) -> Self {
        Self {
            student: first_param(&params, "student"),
            proof: first_param(&params, crate::verifier::PROOF_FIELD),
        }
    }
}

// Treat empty strings like missing values
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn first_value_wins_on_repeated_keys() {
        let query = AdminUnblockQuery::from(params(&[
            ("key", "first"),
            ("student", "a"),
            ("key", "second"),
            ("student", "b"),
        ]));
        assert_eq!(query.key.as_deref(), Some("first"));
        assert_eq!(query.student.as_deref(), Some("a"));
    }

    #[test]
    fn verify_form_reads_turnstile_field() {
        let form = CaptchaVerifyForm::from(params(&[
            ("student", "stu1"),
            ("cf-turnstile-response", "tok"),
            ("cf-turnstile-response", "other"),
        ]));
        assert_eq!(form.proof.as_deref(), Some("tok"));
        assert_eq!(CaptchaQuery::from(Params::new()).student, None);
    }
}
