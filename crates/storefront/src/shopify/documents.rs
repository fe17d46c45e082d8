//! Hand-written GraphQL documents for the Storefront API.
//!
//! Documents that return a full cart or customer splice in the shared
//! fragment; mutations that only need an ID carry their selection inline.

use std::sync::LazyLock;

const CART_FRAGMENT: &str = r"
fragment CartFragment on Cart {
  id
  checkoutUrl
  totalQuantity
  buyerIdentity {
    countryCode
    customer {
      id
      email
      firstName
      lastName
      displayName
    }
    email
    phone
  }
  lines(first: 100) {
    edges {
      node {
        id
        quantity
        attributes {
          key
          value
        }
        cost {
          totalAmount {
            amount
            currencyCode
          }
          subtotalAmount {
            amount
            currencyCode
          }
          amountPerQuantity {
            amount
            currencyCode
          }
        }
        merchandise {
          ... on ProductVariant {
            id
            title
            selectedOptions {
              name
              value
            }
            product {
              id
              title
              handle
              vendor
            }
            image {
              id
              url
              altText
              width
              height
            }
            price {
              amount
              currencyCode
            }
            compareAtPrice {
              amount
              currencyCode
            }
          }
        }
      }
    }
  }
  cost {
    subtotalAmount {
      amount
      currencyCode
    }
    totalAmount {
      amount
      currencyCode
    }
    totalDutyAmount {
      amount
      currencyCode
    }
    totalTaxAmount {
      amount
      currencyCode
    }
  }
  attributes {
    key
    value
  }
  discountCodes {
    code
    applicable
  }
}";

const CUSTOMER_FRAGMENT: &str = r"
fragment CustomerFragment on Customer {
  id
  firstName
  lastName
  displayName
  email
  phone
  defaultAddress {
    id
    formatted
    firstName
    lastName
    company
    address1
    address2
    country
    province
    city
    zip
    phone
  }
  addresses(first: 10) {
    edges {
      node {
        id
        formatted
        firstName
        lastName
        company
        address1
        address2
        country
        province
        city
        zip
        phone
      }
    }
  }
}";

fn with_fragment(operation: &str, fragment: &str) -> String {
    format!("{operation}\n{fragment}")
}

// -----------------------------------------------------------------------------
// Cart
// -----------------------------------------------------------------------------

pub static GET_CART: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
query getCart($cartId: ID!) {
  cart(id: $cartId) {
    ...CartFragment
  }
}",
        CART_FRAGMENT,
    )
});

pub static CART_CREATE: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
mutation createCart($input: CartInput!) {
  cartCreate(input: $input) {
    cart {
      ...CartFragment
    }
    userErrors {
      field
      message
    }
  }
}",
        CART_FRAGMENT,
    )
});

pub static CART_LINES_ADD: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
mutation cartLinesAdd($cartId: ID!, $lines: [CartLineInput!]!) {
  cartLinesAdd(cartId: $cartId, lines: $lines) {
    cart {
      ...CartFragment
    }
    userErrors {
      field
      message
    }
  }
}",
        CART_FRAGMENT,
    )
});

pub static CART_LINES_UPDATE: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
mutation cartLinesUpdate($cartId: ID!, $lines: [CartLineUpdateInput!]!) {
  cartLinesUpdate(cartId: $cartId, lines: $lines) {
    cart {
      ...CartFragment
    }
    userErrors {
      field
      message
    }
  }
}",
        CART_FRAGMENT,
    )
});

pub static CART_LINES_REMOVE: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
mutation cartLinesRemove($cartId: ID!, $lineIds: [ID!]!) {
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {
    cart {
      ...CartFragment
    }
    userErrors {
      field
      message
    }
  }
}",
        CART_FRAGMENT,
    )
});

pub static CART_DISCOUNT_CODES_UPDATE: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
mutation cartDiscountCodesUpdate($cartId: ID!, $discountCodes: [String!]!) {
  cartDiscountCodesUpdate(cartId: $cartId, discountCodes: $discountCodes) {
    cart {
      ...CartFragment
    }
    userErrors {
      field
      message
    }
  }
}",
        CART_FRAGMENT,
    )
});

pub static CART_BUYER_IDENTITY_UPDATE: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
mutation cartBuyerIdentityUpdate($cartId: ID!, $buyerIdentity: CartBuyerIdentityInput!) {
  cartBuyerIdentityUpdate(cartId: $cartId, buyerIdentity: $buyerIdentity) {
    cart {
      ...CartFragment
    }
    userErrors {
      field
      message
    }
  }
}",
        CART_FRAGMENT,
    )
});

// -----------------------------------------------------------------------------
// Customer
// -----------------------------------------------------------------------------

pub static GET_CUSTOMER: LazyLock<String> = LazyLock::new(|| {
    with_fragment(
        r"
query CustomerDetails($customerAccessToken: String!) {
  customer(customerAccessToken: $customerAccessToken) {
    ...CustomerFragment
  }
}",
        CUSTOMER_FRAGMENT,
    )
});

pub const GET_CUSTOMER_ID: &str = r"
query CustomerId($customerAccessToken: String!) {
  customer(customerAccessToken: $customerAccessToken) {
    id
  }
}";

pub const ACCESS_TOKEN_CREATE: &str = r"
mutation CustomerAccessTokenCreate($input: CustomerAccessTokenCreateInput!) {
  customerAccessTokenCreate(input: $input) {
    customerAccessToken {
      accessToken
      expiresAt
    }
    customerUserErrors {
      field
      message
    }
  }
}";

pub const ACCESS_TOKEN_DELETE: &str = r"
mutation CustomerAccessTokenDelete($customerAccessToken: String!) {
  customerAccessTokenDelete(customerAccessToken: $customerAccessToken) {
    deletedAccessToken
    userErrors {
      field
      message
    }
  }
}";

pub const CUSTOMER_CREATE: &str = r"
mutation CustomerCreate($input: CustomerCreateInput!) {
  customerCreate(input: $input) {
    customer {
      id
    }
    customerUserErrors {
      field
      message
    }
  }
}";

pub const CUSTOMER_UPDATE: &str = r"
mutation CustomerUpdate($customerAccessToken: String!, $customer: CustomerUpdateInput!) {
  customerUpdate(customerAccessToken: $customerAccessToken, customer: $customer) {
    customer {
      id
    }
    customerUserErrors {
      field
      message
    }
  }
}";

pub const ADDRESS_CREATE: &str = r"
mutation CustomerAddressCreate($customerAccessToken: String!, $address: MailingAddressInput!) {
  customerAddressCreate(customerAccessToken: $customerAccessToken, address: $address) {
    customerAddress {
      id
    }
    customerUserErrors {
      field
      message
    }
  }
}";

pub const ADDRESS_UPDATE: &str = r"
mutation CustomerAddressUpdate($customerAccessToken: String!, $id: ID!, $address: MailingAddressInput!) {
  customerAddressUpdate(customerAccessToken: $customerAccessToken, id: $id, address: $address) {
    customerAddress {
      id
    }
    customerUserErrors {
      field
      message
    }
  }
}";

pub const ADDRESS_DELETE: &str = r"
mutation CustomerAddressDelete($customerAccessToken: String!, $id: ID!) {
  customerAddressDelete(customerAccessToken: $customerAccessToken, id: $id) {
    deletedCustomerAddressId
    customerUserErrors {
      field
      message
    }
  }
}";

pub const DEFAULT_ADDRESS_UPDATE: &str = r"
mutation CustomerDefaultAddressUpdate($customerAccessToken: String!, $addressId: ID!) {
  customerDefaultAddressUpdate(customerAccessToken: $customerAccessToken, addressId: $addressId) {
    customer {
      id
    }
    customerUserErrors {
      field
      message
    }
  }
}";

pub const CUSTOMER_RECOVER: &str = r"
mutation CustomerRecover($email: String!) {
  customerRecover(email: $email) {
    customerUserErrors {
      field
      message
    }
  }
}";

pub const CUSTOMER_RESET: &str = r"
mutation CustomerReset($id: ID!, $input: CustomerResetInput!) {
  customerReset(id: $id, input: $input) {
    customerAccessToken {
      accessToken
      expiresAt
    }
    customerUserErrors {
      field
      message
    }
  }
}";

pub const GET_ORDERS: &str = r"
query CustomerOrders($customerAccessToken: String!, $first: Int!, $after: String) {
  customer(customerAccessToken: $customerAccessToken) {
    orders(first: $first, after: $after, sortKey: PROCESSED_AT, reverse: true) {
      pageInfo {
        hasNextPage
        endCursor
      }
      edges {
        node {
          id
          orderNumber
          processedAt
          financialStatus
          fulfillmentStatus
          currentTotalPrice {
            amount
            currencyCode
          }
          lineItems(first: 2) {
            edges {
              node {
                title
                variant {
                  image {
                    id
                    url
                    altText
                    width
                    height
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}";

// -----------------------------------------------------------------------------
// Metafields
// -----------------------------------------------------------------------------

pub const GET_CUSTOMER_METAFIELDS: &str = r"
query GetCustomerMetafields($customerAccessToken: String!, $identifiers: [HasMetafieldsIdentifier!]!) {
  customer(customerAccessToken: $customerAccessToken) {
    id
    metafields(identifiers: $identifiers) {
      id
      namespace
      key
      value
      type
    }
  }
}";

pub const METAFIELDS_SET: &str = r"
mutation SetMetafield($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields {
      id
      namespace
      key
      value
      type
    }
    userErrors {
      field
      message
    }
  }
}";

pub const METAFIELD_DELETE: &str = r"
mutation DeleteMetafield($input: MetafieldDeleteInput!) {
  metafieldDelete(input: $input) {
    deletedId
    userErrors {
      field
      message
    }
  }
}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_documents_include_fragment() {
        for doc in [
            GET_CART.as_str(),
            CART_CREATE.as_str(),
            CART_LINES_ADD.as_str(),
            CART_LINES_UPDATE.as_str(),
            CART_LINES_REMOVE.as_str(),
            CART_DISCOUNT_CODES_UPDATE.as_str(),
            CART_BUYER_IDENTITY_UPDATE.as_str(),
        ] {
            assert!(doc.contains("...CartFragment"));
            assert!(doc.contains("fragment CartFragment on Cart"));
        }
    }

    #[test]
    fn test_customer_query_includes_fragment() {
        assert!(GET_CUSTOMER.contains("fragment CustomerFragment on Customer"));
        assert!(!ACCESS_TOKEN_CREATE.contains("fragment"));
    }
}
