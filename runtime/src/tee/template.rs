//! RA-TLS certificate template.
//!
//! The template carries every field of the to-be-signed certificate: the
//! fixed subject/issuer name, serial number 1, the validity window, basic
//! constraints (not a CA), key identifiers, and the quote extension. It also
//! records the key the quote was bound to, so it can only be signed by that
//! key.

use chrono::NaiveDateTime;
use ratls_core::error::{RaTlsError, Result};
use ratls_core::ratls::{oid_arcs, CERT_SERIAL_NUMBER, CERT_SUBJECT_NAME, QUOTE_EXTENSION_OID};
use ratls_core::Validity;
use rcgen::{
    CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa, KeyIdMethod,
    SerialNumber,
};
use rsa::RsaPublicKey;
use time::OffsetDateTime;

use super::binding::{Quote, ReportData};

/// To-be-signed RA-TLS certificate bound to one public key.
#[derive(Debug)]
pub struct CertificateTemplate {
    params: CertificateParams,
    subject_key: RsaPublicKey,
    report_data: ReportData,
}

impl CertificateTemplate {
    /// Build the template for `public_key` with `quote` embedded.
    ///
    /// Fails if `quote` was not obtained for `public_key`, or if any field
    /// cannot be set. No partially filled template is ever returned.
    pub fn build(public_key: &RsaPublicKey, quote: &Quote, validity: &Validity) -> Result<Self> {
        let report_data = ReportData::from_public_key(public_key)?;
        if quote.report_data() != &report_data {
            return Err(RaTlsError::Encoding(
                "Quote was obtained for a different public key".to_string(),
            ));
        }

        let mut params = CertificateParams::default();

        // Self-signed: rcgen writes the same name as subject and issuer
        params.distinguished_name = parse_distinguished_name(CERT_SUBJECT_NAME)
            .map_err(|e| RaTlsError::field("subject", e))?;

        params.serial_number = Some(SerialNumber::from_slice(&[CERT_SERIAL_NUMBER]));

        let not_before = to_offset_date_time(validity.not_before)
            .map_err(|e| RaTlsError::field("validity", e))?;
        let not_after = to_offset_date_time(validity.not_after)
            .map_err(|e| RaTlsError::field("validity", e))?;
        if not_before >= not_after {
            return Err(RaTlsError::field(
                "validity",
                format!(
                    "not_before {} is not earlier than not_after {}",
                    validity.not_before, validity.not_after
                ),
            ));
        }
        params.not_before = not_before;
        params.not_after = not_after;

        // rcgen always emits basic constraints as critical
        params.is_ca = IsCa::ExplicitNoCa;

        // Subject and authority key identifiers, both from the one key
        params.key_identifier_method = KeyIdMethod::Sha256;
        params.use_authority_key_identifier_extension = true;

        let arcs = oid_arcs(QUOTE_EXTENSION_OID);
        if arcs.len() < 2 {
            return Err(RaTlsError::field(
                "quote extension",
                format!("invalid OID {}", QUOTE_EXTENSION_OID),
            ));
        }
        let mut quote_ext = CustomExtension::from_oid_content(&arcs, quote.as_bytes().to_vec());
        quote_ext.set_criticality(false);
        params.custom_extensions = vec![quote_ext];

        Ok(Self {
            params,
            subject_key: public_key.clone(),
            report_data,
        })
    }

    pub fn params(&self) -> &CertificateParams {
        &self.params
    }

    /// Public key the embedded quote is bound to.
    pub fn subject_key(&self) -> &RsaPublicKey {
        &self.subject_key
    }

    pub fn report_data(&self) -> &ReportData {
        &self.report_data
    }
}

/// Parse a comma-separated distinguished name such as `CN=a,O=b,C=US`.
///
/// Attributes keep their order.
pub fn parse_distinguished_name(name: &str) -> std::result::Result<DistinguishedName, String> {
    let mut dn = DistinguishedName::new();

    for part in name.split(',') {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("malformed attribute '{}'", part))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("empty value for attribute '{}'", key.trim()));
        }

        let dn_type = match key.trim() {
            "CN" => DnType::CommonName,
            "O" => DnType::OrganizationName,
            "OU" => DnType::OrganizationalUnitName,
            "C" => DnType::CountryName,
            "L" => DnType::LocalityName,
            "ST" => DnType::StateOrProvinceName,
            other => return Err(format!("unsupported attribute '{}'", other)),
        };
        dn.push(dn_type, value);
    }

    Ok(dn)
}

fn to_offset_date_time(ts: NaiveDateTime) -> std::result::Result<OffsetDateTime, String> {
    OffsetDateTime::from_unix_timestamp(ts.and_utc().timestamp()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tee::test_support::{other_private_key, test_public_key};
    use chrono::NaiveDate;

    fn quote_for(key: &RsaPublicKey, bytes: &[u8]) -> Quote {
        Quote::from_parts(bytes.to_vec(), ReportData::from_public_key(key).unwrap())
    }

    #[test]
    fn test_build_template_fields() {
        let key = test_public_key();
        let quote = quote_for(key, &[0xDE, 0xAD, 0xBE, 0xEF]);
        let template = CertificateTemplate::build(key, &quote, &Validity::default()).unwrap();

        let params = template.params();
        assert_eq!(params.serial_number, Some(SerialNumber::from_slice(&[1])));
        assert!(matches!(params.is_ca, IsCa::ExplicitNoCa));
        assert!(params.use_authority_key_identifier_extension);
        assert_eq!(params.custom_extensions.len(), 1);
        assert_eq!(params.not_before.unix_timestamp(), 978_307_200);
        assert_eq!(params.not_after.unix_timestamp(), 1_924_991_999);
        assert_eq!(template.subject_key(), key);
        assert_eq!(template.report_data(), quote.report_data());
    }

    #[test]
    fn test_build_rejects_quote_for_other_key() {
        let other = other_private_key().to_public_key();
        let quote = quote_for(&other, &[0xDE, 0xAD, 0xBE, 0xEF]);
        let result = CertificateTemplate::build(test_public_key(), &quote, &Validity::default());
        assert!(matches!(result, Err(RaTlsError::Encoding(_))));
    }

    #[test]
    fn test_build_rejects_inverted_validity() {
        let key = test_public_key();
        let quote = quote_for(key, &[1, 2, 3]);
        let validity = Validity {
            not_before: NaiveDate::from_ymd_opt(2030, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            not_after: NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        match CertificateTemplate::build(key, &quote, &validity) {
            Err(RaTlsError::CertificateField { field, .. }) => assert_eq!(field, "validity"),
            other => panic!("expected CertificateField, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_distinguished_name() {
        let dn = parse_distinguished_name(CERT_SUBJECT_NAME).unwrap();
        let entries: Vec<_> = dn.iter().map(|(ty, _)| ty.clone()).collect();
        assert_eq!(
            entries,
            vec![DnType::CommonName, DnType::OrganizationName, DnType::CountryName]
        );
    }

    #[test]
    fn test_parse_distinguished_name_errors() {
        assert!(parse_distinguished_name("CN").is_err());
        assert!(parse_distinguished_name("CN=").is_err());
        assert!(parse_distinguished_name("XX=value").is_err());
    }
}
