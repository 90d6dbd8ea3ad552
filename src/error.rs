/// Errors in the JWS signing and verification pathway.
#[derive(thiserror::Error, Debug)]
pub enum JwsError {
    /// The JOSE header has no `alg` parameter
    #[error("Missing algorithm in JWS header")]
    MissingAlgorithm,

    /// The `alg` parameter names an algorithm this crate does not implement
    #[error("Unsupported algorithm: '{0}'")]
    UnsupportedAlgorithm(String),

    /// Algorithm in JWS header does not match the signer or verifier
    #[error("Algorithm in JWS header does not match key")]
    AlgorithmMismatch,

    /// Not a compact JWS
    #[error("Invalid JWS")]
    InvalidJws,

    #[error("Invalid signature")]
    InvalidSignature,

    /// Key material could not be turned into a signer or verifier
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

/// Errors in the decode pathway
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// Unable to deserialize string format of concatenated tildes
    #[error("Unable to deserialize string format of concatenated tildes")]
    UnableToDeserializeStringFormat,

    /// A disclosure is not base64url, not JSON, or not a 2 or 3 element array
    #[error("A disclosure is malformed")]
    MalformedDisclosure,

    /// JWT is missing _sd_alg property
    #[error("JWT is missing _sd_alg property")]
    MissingSdAlg,

    /// Unknown value of _sd_alg
    #[error("Unknown value of _sd_alg {0}")]
    UnknownSdAlg(String),

    /// JWT payload claims were not a JSON object
    #[error("JWT payload claims were not a JSON object")]
    PayloadNotObject,

    /// Bubbled up error from the issuer-signed JWS
    #[error(transparent)]
    Jws(#[from] JwsError),
}

/// Errors in the encode pathway
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// Two claims with the same name were declared at one object level
    #[error("Claim `{0}` is declared more than once at the same level")]
    DuplicateClaim(String),

    /// A claim name or a plain value uses a property reserved by SD-JWT
    #[error("Claim `{0}` uses a property name reserved by SD-JWT")]
    ReservedClaimName(String),

    /// Bubbled up error from signing
    #[error(transparent)]
    Jws(#[from] JwsError),

    /// Bubbled up error from serde_json
    #[error(transparent)]
    JsonSerialization(#[from] serde_json::Error),
}

/// Errors in the disclosure selection pathway
#[derive(thiserror::Error, Debug)]
pub enum SelectError {
    /// Path is empty or has an empty segment
    #[error("Not a claim path: `{0}`")]
    InvalidPath(String),

    /// Path does not start at the `$` root
    #[error("Path does not start from the JSON root `$`: `{0}`")]
    PathNotFromRoot(String),

    /// A stored disclosure could not be decoded
    #[error("Disclosure `{0}` is not decodable")]
    DisclosureNotDecodable(String),

    /// No usable digest algorithm for the stored disclosures
    #[error("Disclosure `{0}` is not digestable")]
    DisclosureNotDigestable(String),

    /// Issuer-signed payload is not readable
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors while matching disclosures against the signed payload
#[derive(thiserror::Error, Debug)]
pub enum RevealError {
    /// A presented disclosure's digest is not referenced by the payload
    #[error("Disclosure `{0}` is not referenced by the payload")]
    DisclosureNotInPayload(String),

    /// Multiple disclosures given with the same hash
    #[error("Multiple disclosures given with the same hash")]
    DuplicateDisclosure,

    /// A single disclosure was used multiple times
    #[error("A single disclosure was used multiple times")]
    DisclosureUsedMultipleTimes,

    /// A disclosure claim would collide with an existing JWT claim
    #[error("Disclosed claim `{0}` collides with an existing claim")]
    ClaimCollision(String),

    /// An _sd property was not an array type
    #[error("An _sd property was not an array type")]
    SdClaimNotArray,

    /// An _sd entry wasn't a string
    #[error("An _sd entry wasn't a string")]
    InvalidDigest,

    /// Found an array item disclosure when expecting a property type
    #[error("Found an array item disclosure when expecting a property type")]
    ExpectedObjectEntryDisclosure,

    /// Found a property type disclosure when expecting an array item
    #[error("Found a property type disclosure when expecting an array item")]
    ExpectedArrayItemDisclosure,
}

/// Errors in the key binding pathway
#[derive(thiserror::Error, Debug)]
pub enum KeyBindingError {
    /// Key binding JWT required but not presented
    #[error("Missing key binding JWT")]
    MissingKeyBinding,

    /// A key binding JWT was presented to a verification that does not
    /// check it, use `SdJwtVerifier::verify_with_key_binding`
    #[error("Key binding JWT present but not verified")]
    UnverifiedKeyBinding,

    /// The `typ` header is not `kb+jwt`
    #[error("Key binding JWT has wrong type: {0:?}")]
    WrongType(Option<String>),

    #[error("Key binding JWT audience mismatch")]
    AudienceMismatch,

    #[error("Key binding JWT nonce mismatch")]
    NonceMismatch,

    /// `sd_hash` does not match the presented SD-JWT
    #[error("Key binding JWT does not bind this presentation")]
    SdHashMismatch,

    /// `iat` is outside of the accepted clock skew
    #[error("Key binding JWT issued at {0}, outside of accepted skew")]
    IssuedAtOutOfRange(i64),

    #[error(transparent)]
    Jws(#[from] JwsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The SD-JWT to bind is unreadable
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors in the verification pathway
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    /// Outer signature or header is not acceptable
    #[error(transparent)]
    Jws(#[from] JwsError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Reveal(#[from] RevealError),

    #[error(transparent)]
    KeyBinding(#[from] KeyBindingError),
}
